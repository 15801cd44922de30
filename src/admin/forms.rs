use serde::Deserialize;

use crate::db::{DEFAULT_SITE_TITLE, DEFAULT_WELCOME_MESSAGE, parse_tag_list};
use crate::media::HotlinkPolicy;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EditImageForm {
    pub title: String,
    pub description: String,
    pub tags: String,
}

impl EditImageForm {
    pub fn tag_names(&self) -> Vec<String> {
        parse_tag_list(&self.tags)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AnnouncementForm {
    pub content: String,
}

/// `enable` is the HTML checkbox value, present as `on` only when ticked.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HotlinkForm {
    pub enable: Option<String>,
    pub domains: String,
}

impl HotlinkForm {
    pub fn into_policy(self) -> HotlinkPolicy {
        let enabled = self.enable.as_deref() == Some("on");
        HotlinkPolicy::new(enabled, self.domains.lines())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SiteSettingsForm {
    pub site_title: String,
    pub welcome_message: String,
}

impl SiteSettingsForm {
    /// Blank fields fall back to the defaults.
    pub fn resolved(&self) -> (String, String) {
        let pick = |value: &str, default: &str| {
            let value = value.trim();
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };
        (
            pick(&self.site_title, DEFAULT_SITE_TITLE),
            pick(&self.welcome_message, DEFAULT_WELCOME_MESSAGE),
        )
    }
}

/// Collect the repeated `image_ids` keys of a form body. Values that are not
/// ids are skipped.
pub fn parse_image_ids(body: &[u8]) -> Vec<i64> {
    let mut ids = Vec::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        if key == "image_ids"
            && let Ok(id) = value.trim().parse::<i64>()
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ids_repeat_and_skip_garbage() {
        assert_eq!(
            parse_image_ids(b"image_ids=4&image_ids=x&other=1&image_ids=9&image_ids=4"),
            vec![4, 9]
        );
        assert!(parse_image_ids(b"").is_empty());
    }

    #[test]
    fn hotlink_checkbox_and_domains() {
        let policy = HotlinkForm {
            enable: Some("on".to_string()),
            domains: "Example.com\r\n\r\n  cdn.example.org \n".to_string(),
        }
        .into_policy();
        assert!(policy.enabled);
        assert_eq!(policy.allowed_domains, vec!["example.com", "cdn.example.org"]);

        let off = HotlinkForm {
            enable: None,
            domains: String::new(),
        }
        .into_policy();
        assert!(!off.enabled);
        assert!(off.allowed_domains.is_empty());
    }

    #[test]
    fn site_settings_blank_fields_use_defaults() {
        let form = SiteSettingsForm {
            site_title: "  ".to_string(),
            welcome_message: "Hello".to_string(),
        };
        assert_eq!(
            form.resolved(),
            (DEFAULT_SITE_TITLE.to_string(), "Hello".to_string())
        );
    }

    #[test]
    fn edit_form_tags_are_split() {
        let form = EditImageForm {
            tags: "sky, sea,,sky".to_string(),
            ..Default::default()
        };
        assert_eq!(form.tag_names(), vec!["sky", "sea"]);
    }
}
