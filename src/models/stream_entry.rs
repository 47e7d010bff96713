//! Stream entry model
//!
//! A [`StreamEntry`] is one playlist line pointing at a stream, together with
//! the per-stream HTTP overrides needed to reach it and the presentation data
//! used when it is written back out.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::defaults::{DEFAULT_GROUP_TITLE, INTERNATIONAL_AREA_CODE};
use crate::errors::{EntryError, EntryResult};
use crate::models::reference::{AreaRef, CategoryRef, LanguageRef};
use crate::utils::UrlUtils;

/// One playlist entry referencing a stream
///
/// `Clone` produces an independent copy: the membership sets are cloned, so
/// decorating a clone never affects the original.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub name: String,
    pub url: String,
    pub channel_id: Option<String>,
    pub http_referrer: Option<String>,
    pub http_user_agent: Option<String>,
    pub label: Option<String>,
    pub quality: Option<String>,
    pub logo: Option<String>,
    pub group_title: String,
    pub source_file: String,
    pub source_line: usize,
    pub categories: HashSet<CategoryRef>,
    pub languages: HashSet<LanguageRef>,
    pub broadcast_areas: HashSet<AreaRef>,
    pub is_nsfw: bool,
    pub removed: bool,
}

/// Constructor properties for a [`StreamEntry`], as produced by the playlist reader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEntryData {
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub filepath: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub http_referrer: Option<String>,
    #[serde(default)]
    pub http_user_agent: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// Machine-readable view of an entry
///
/// Every key is always present; absent values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub channel: Option<String>,
    pub url: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl From<StreamEntryData> for StreamEntry {
    fn from(data: StreamEntryData) -> Self {
        Self {
            name: data.name,
            url: data.url,
            channel_id: non_empty(data.channel),
            http_referrer: non_empty(data.http_referrer),
            http_user_agent: non_empty(data.http_user_agent),
            label: non_empty(data.label),
            quality: non_empty(data.quality),
            logo: None,
            group_title: DEFAULT_GROUP_TITLE.to_string(),
            source_file: data.filepath,
            source_line: data.line,
            categories: HashSet::new(),
            languages: HashSet::new(),
            broadcast_areas: HashSet::new(),
            is_nsfw: false,
            removed: false,
        }
    }
}

impl StreamEntry {
    pub fn new<N: Into<String>, U: Into<String>>(name: N, url: U) -> Self {
        StreamEntryData {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
        .into()
    }

    pub fn with_channel<S: Into<String>>(mut self, channel_id: S) -> Self {
        self.channel_id = non_empty(Some(channel_id.into()));
        self
    }

    pub fn with_referrer<S: Into<String>>(mut self, referrer: S) -> Self {
        self.http_referrer = non_empty(Some(referrer.into()));
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.http_user_agent = non_empty(Some(user_agent.into()));
        self
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = non_empty(Some(label.into()));
        self
    }

    pub fn with_quality<S: Into<String>>(mut self, quality: S) -> Self {
        self.quality = non_empty(Some(quality.into()));
        self
    }

    /// Rewrite `url` into canonical form
    ///
    /// Leaves the entry untouched and returns [`EntryError::InvalidUrl`] when
    /// the stored string does not parse.
    pub fn normalize(&mut self) -> EntryResult<()> {
        let normalized = UrlUtils::normalize(&self.url)
            .map_err(|e| EntryError::invalid_url(self.url.clone(), e))?;
        self.url = normalized;
        Ok(())
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn has_channel(&self) -> bool {
        present(&self.channel_id).is_some()
    }

    pub fn add_category(&mut self, category: CategoryRef) -> bool {
        self.categories.insert(category)
    }

    pub fn add_language(&mut self, language: LanguageRef) -> bool {
        self.languages.insert(language)
    }

    pub fn add_broadcast_area(&mut self, area: AreaRef) -> bool {
        self.broadcast_areas.insert(area)
    }

    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn has_category(&self, category: &CategoryRef) -> bool {
        self.categories.contains(category.code())
    }

    pub fn has_languages(&self) -> bool {
        !self.languages.is_empty()
    }

    pub fn has_language(&self, language: &LanguageRef) -> bool {
        self.languages.contains(language.code())
    }

    pub fn has_broadcast_area(&self) -> bool {
        !self.broadcast_areas.is_empty()
    }

    pub fn is_international(&self) -> bool {
        self.broadcast_areas.contains(INTERNATIONAL_AREA_CODE)
    }

    pub fn is_sfw(&self) -> bool {
        !self.is_nsfw
    }

    /// Display title: name, then ` (quality)`, then ` [label]`
    pub fn title(&self) -> String {
        let mut title = self.name.clone();

        if let Some(quality) = present(&self.quality) {
            title.push_str(&format!(" ({quality})"));
        }

        if let Some(label) = present(&self.label) {
            title.push_str(&format!(" [{label}]"));
        }

        title
    }

    /// Render the entry as an extended-M3U stanza
    ///
    /// The public view adds logo and group attributes. Referrer and user
    /// agent are emitted both as attributes and as `#EXTVLCOPT` lines, and
    /// only when set. The URL always ends the stanza on its own line.
    pub fn to_playlist_record(&self, public_view: bool) -> String {
        let referrer = present(&self.http_referrer);
        let user_agent = present(&self.http_user_agent);

        let mut output = format!(
            "#EXTINF:-1 tvg-id=\"{}\"",
            present(&self.channel_id).unwrap_or_default()
        );

        if public_view {
            output.push_str(&format!(
                " tvg-logo=\"{}\" group-title=\"{}\"",
                present(&self.logo).unwrap_or_default(),
                self.group_title
            ));
        }

        if let Some(referrer) = referrer {
            output.push_str(&format!(" http-referrer=\"{referrer}\""));
        }

        if let Some(user_agent) = user_agent {
            output.push_str(&format!(" http-user-agent=\"{user_agent}\""));
        }

        output.push(',');
        output.push_str(&self.title());

        if let Some(referrer) = referrer {
            output.push_str(&format!("\n#EXTVLCOPT:http-referrer={referrer}"));
        }

        if let Some(user_agent) = user_agent {
            output.push_str(&format!("\n#EXTVLCOPT:http-user-agent={user_agent}"));
        }

        output.push('\n');
        output.push_str(&self.url);

        output
    }

    /// Machine-readable record exposing channel, url, referrer and user agent
    pub fn to_record(&self) -> StreamRecord {
        StreamRecord {
            channel: present(&self.channel_id).map(str::to_string),
            url: self.url.clone(),
            referrer: present(&self.http_referrer).map(str::to_string),
            user_agent: present(&self.http_user_agent).map(str::to_string),
        }
    }

    /// Constructor properties this entry was (or could have been) built from
    pub fn data(&self) -> StreamEntryData {
        StreamEntryData {
            name: self.name.clone(),
            url: self.url.clone(),
            filepath: self.source_file.clone(),
            line: self.source_line,
            channel: self.channel_id.clone(),
            http_referrer: self.http_referrer.clone(),
            http_user_agent: self.http_user_agent.clone(),
            label: self.label.clone(),
            quality: self.quality.clone(),
        }
    }
}
