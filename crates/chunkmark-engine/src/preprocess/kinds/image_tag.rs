use std::sync::OnceLock;

use regex::Regex;

use crate::preprocess::Preprocessor;

/// `<img>src</img>` to a standalone image paragraph.
pub struct ImageTag;

impl Preprocessor for ImageTag {
    fn name(&self) -> &str {
        "image_tag"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn process(&self, text: &str) -> String {
        static TAG: OnceLock<Regex> = OnceLock::new();
        let tag = TAG.get_or_init(|| {
            Regex::new(r"(?s)<img>\s*(.*?)\s*</img>").expect("Invalid image tag regex")
        });
        tag.replace_all(text, "\n\n![](${1})\n\n").into_owned()
    }
}
