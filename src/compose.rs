//! Outreach message templating.

/// Replace `placeholder` in `template` with `value`.
///
/// Plain substring substitution: no escaping and no template syntax. A
/// template without the placeholder (or an empty placeholder) comes back
/// unchanged.
pub fn compose(template: &str, placeholder: &str, value: &str) -> String {
    if placeholder.is_empty() {
        return template.to_string();
    }
    template.replace(placeholder, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholder() {
        let out = compose(
            "Saw your post (link of the post), great read!",
            "link of the post",
            "https://www.reddit.com/r/rust/comments/abc/",
        );
        assert_eq!(
            out,
            "Saw your post (https://www.reddit.com/r/rust/comments/abc/), great read!"
        );
        assert!(!out.contains("link of the post"));
    }

    #[test]
    fn missing_placeholder_is_identity() {
        let tpl = "Hello there";
        assert_eq!(compose(tpl, "link of the comment", "x"), tpl);
    }

    #[test]
    fn empty_placeholder_is_identity() {
        assert_eq!(compose("abc", "", "zzz"), "abc");
    }

    #[test]
    fn value_is_not_escaped() {
        assert_eq!(compose("<p>", "p", "&"), "<&>");
    }
}
