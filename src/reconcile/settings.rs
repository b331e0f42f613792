//! Best-effort mutation of per-video settings.
//!
//! Each setting is a single-choice `<select>` on the video settings page. The
//! current value is read first and left alone when it already matches, so
//! repeated runs do not resubmit forms.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::SettingsTargets;
use crate::locator::ResourceIdentifier;
use crate::page::{By, FindOptions, PageError, PageProvider};
use crate::site::{
    EMBED_PRESET_SETTING, LANGUAGE_SETTING, QUALITY_TIER_SETTING, SettingControl,
    video_settings_url,
};

/// A setting could not be applied.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The desired value is not among the options.
    #[error("{setting} '{value}' is not offered")]
    NotOffered {
        setting: &'static str,
        value: String,
    },

    /// The option exists but cannot be chosen.
    #[error("{setting} '{value}' is disabled")]
    Disabled {
        setting: &'static str,
        value: String,
    },

    /// No save button was found after choosing the option.
    #[error("no save button for {setting}")]
    SaveMissing { setting: &'static str },

    /// The page session failed.
    #[error("{setting}: {source}")]
    Page {
        setting: &'static str,
        #[source]
        source: PageError,
    },
}

/// What an [`apply_settings`] pass did.
#[derive(Debug, Default)]
pub struct SettingsOutcome {
    /// Settings that were changed.
    pub changed: Vec<&'static str>,
    /// Settings that already had the desired value.
    pub unchanged: Vec<&'static str>,
    pub errors: Vec<SettingsError>,
}

/// Whether settings of a video by `author` may be changed by `account`.
///
/// Nothing is attempted without a logged-in account. An unknown author is
/// given the benefit of the doubt.
#[must_use]
pub fn may_edit(account: Option<&str>, author: Option<&str>) -> bool {
    match (account, author) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(account), Some(author)) => account.eq_ignore_ascii_case(author),
    }
}

/// Applies `targets` on the settings page of `video`.
#[instrument(skip(page, targets), fields(url = %video))]
pub async fn apply_settings(
    page: &dyn PageProvider,
    video: &ResourceIdentifier,
    targets: &SettingsTargets,
    timeout: Duration,
) -> SettingsOutcome {
    let mut outcome = SettingsOutcome::default();
    let wanted: Vec<(SettingControl, &str)> = [
        (LANGUAGE_SETTING, targets.language.as_deref()),
        (EMBED_PRESET_SETTING, targets.embed_preset.as_deref()),
        (QUALITY_TIER_SETTING, targets.quality_tier.as_deref()),
    ]
    .into_iter()
    .filter_map(|(control, value)| value.map(|value| (control, value)))
    .collect();
    if wanted.is_empty() {
        return outcome;
    }

    if let Err(source) = page.navigate(&video_settings_url(video.canonical())).await {
        outcome.errors.push(SettingsError::Page {
            setting: "settings page",
            source,
        });
        return outcome;
    }

    for (control, value) in wanted {
        match apply_one(page, control, value, timeout).await {
            Ok(true) => {
                info!(setting = control.name, value, "setting changed");
                outcome.changed.push(control.name);
            }
            Ok(false) => {
                debug!(setting = control.name, value, "setting already applied");
                outcome.unchanged.push(control.name);
            }
            Err(error) => outcome.errors.push(error),
        }
    }
    outcome
}

/// Returns whether the setting had to be changed.
async fn apply_one(
    page: &dyn PageProvider,
    control: SettingControl,
    value: &str,
    timeout: Duration,
) -> Result<bool, SettingsError> {
    let setting = control.name;
    let page_error = |source| SettingsError::Page { setting, source };

    let mut chosen = None;
    for option in page
        .find_all(&By::css(control.options))
        .await
        .map_err(page_error)?
    {
        let text = option.text().await.map_err(page_error)?;
        let option_value = option.attribute("value").await.map_err(page_error)?;
        if text.trim().eq_ignore_ascii_case(value)
            || option_value.is_some_and(|v| v.eq_ignore_ascii_case(value))
        {
            chosen = Some(option);
            break;
        }
    }
    let option = chosen.ok_or_else(|| SettingsError::NotOffered {
        setting,
        value: value.to_string(),
    })?;

    if option.is_selected().await.map_err(page_error)? {
        return Ok(false);
    }
    if !option.is_enabled().await.map_err(page_error)? {
        return Err(SettingsError::Disabled {
            setting,
            value: value.to_string(),
        });
    }
    option.click().await.map_err(page_error)?;

    let save = page
        .find_one(&By::css(control.save), FindOptions::waiting(timeout))
        .await
        .map_err(page_error)?
        .ok_or(SettingsError::SaveMissing { setting })?;
    save.click().await.map_err(page_error)?;
    Ok(true)
}
