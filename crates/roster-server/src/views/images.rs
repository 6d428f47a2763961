use maud::{html, Markup};

const AVATAR_ONERROR: &str = "this.style.display='none';\
if(this.nextElementSibling)this.nextElementSibling.style.display='inline-flex';";

fn initial(username: &str) -> String {
    username
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// Avatar with an initial-letter placeholder. A broken image hides itself and
/// reveals the placeholder; nothing is retried.
pub fn avatar_image(src: Option<&str>, username: &str) -> Markup {
    html! {
        @match src {
            None => {
                span.avatar.avatar-fallback style="display:inline-flex" { (initial(username)) }
            }
            Some(src) => {
                img.avatar src=(src) alt=(username) onerror=(AVATAR_ONERROR);
                span.avatar.avatar-fallback style="display:none" { (initial(username)) }
            }
        }
    }
}

/// Banner image; renders nothing without a source and hides its container when loading fails.
pub fn banner_image(src: Option<&str>, alt: &str) -> Markup {
    html! {
        @if let Some(src) = src {
            div.banner-wrap {
                img.banner src=(src) alt=(alt) onerror="this.parentElement.style.display='none';";
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_avatar_shows_initial() {
        let html = avatar_image(None, "lena").into_string();
        assert!(html.contains(">L</span>"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn avatar_carries_hidden_fallback_sibling() {
        let html = avatar_image(Some("/media/avatars/1.png"), "lena").into_string();
        assert!(html.contains("src=\"/media/avatars/1.png\""));
        assert!(html.contains("onerror="));
        assert!(html.contains("style=\"display:none\">L</span>"));
    }

    #[test]
    fn banner_without_source_renders_nothing() {
        assert_eq!(banner_image(None, "Banner").into_string(), "");
        assert!(banner_image(Some("/b.png"), "Banner")
            .into_string()
            .contains("parentElement"));
    }

    #[test]
    fn image_source_is_escaped() {
        let html = avatar_image(Some("x\" onload=\"alert(1)"), "a").into_string();
        assert!(!html.contains("onload=\"alert"));
    }
}
