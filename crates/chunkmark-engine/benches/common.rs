// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\nParagraph with some content and $x^2 + y^2$ inline.\n\n- Bullet point\n  - Nested item\n- Another item\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_formula_heavy(count: usize) -> String {
    let mut content = String::new();
    for i in 0..count {
        content.push_str(&format!("Step {i}: $a_{i} = \\frac{{{i}}}{{2}}$ holds.\n\n"));
        if i % 5 == 0 {
            content.push_str("$$\n\\begin{aligned} x &= 1 \\\\ y &= 2 \\end{aligned}\n$$\n\n");
        }
    }
    content
}

/// Splits `text` into tokens of roughly `step` characters.
#[allow(dead_code)]
pub fn tokens(text: &str, step: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(step)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    out
}
