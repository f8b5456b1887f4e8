//! Author attribution.
//!
//! A content item names its author either through a contributor reference or
//! a raw username. Both are resolved once into an [`AuthorSubject`], so page
//! rendering never has to branch on which field happened to be set.

use std::collections::{BTreeSet, HashMap};

use pressroom_core::{Content, Contributor, UserAuthor, model::SocialLink, slugify};

/// The subject of one author page.
#[derive(Debug, Clone)]
pub enum AuthorSubject<'a> {
    Contributor(&'a Contributor),
    RawUsername {
        username: String,
        profile: Option<&'a UserAuthor>,
    },
}

impl AuthorSubject<'_> {
    /// Path segment under `authors/`.
    pub fn key(&self) -> String {
        match self {
            Self::Contributor(c) => url_key(&c.handle),
            Self::RawUsername { username, .. } => url_key(username),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Contributor(c) => c.display_name(),
            Self::RawUsername { username, profile } => profile
                .map(|p| p.name.trim())
                .filter(|name| !name.is_empty())
                .unwrap_or(username.as_str())
                .to_string(),
        }
    }

    pub fn bio(&self) -> &str {
        match self {
            Self::Contributor(c) => &c.bio,
            Self::RawUsername { profile, .. } => profile.map(|p| p.bio.as_str()).unwrap_or(""),
        }
    }

    /// Photo path relative to the site workspace.
    pub fn photo_path(&self) -> Option<&str> {
        match self {
            Self::Contributor(c) => c.photo_path.as_deref(),
            Self::RawUsername { profile, .. } => profile.and_then(|p| p.photo_path.as_deref()),
        }
    }

    pub fn social_links(&self) -> &[SocialLink] {
        match self {
            Self::Contributor(c) => &c.social_links,
            Self::RawUsername { .. } => &[],
        }
    }
}

impl PartialEq for AuthorSubject<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Contributor(a), Self::Contributor(b)) => a.id == b.id,
            (Self::RawUsername { username: a, .. }, Self::RawUsername { username: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

/// Contributor and user lookups for one site.
#[derive(Debug, Clone)]
pub struct AuthorDirectory<'a> {
    contributors: &'a [Contributor],
    users: &'a HashMap<String, UserAuthor>,
}

impl<'a> AuthorDirectory<'a> {
    pub fn new(contributors: &'a [Contributor], users: &'a HashMap<String, UserAuthor>) -> Self {
        Self {
            contributors,
            users,
        }
    }

    /// Resolve who wrote `content`.
    ///
    /// Contributor reference first, then a contributor whose handle equals the
    /// raw username, then the raw username itself.
    pub fn attribute(&self, content: &Content) -> Option<AuthorSubject<'a>> {
        if let Some(id) = content.contributor_id
            && let Some(contributor) = self.contributors.iter().find(|c| c.id == id)
        {
            return Some(AuthorSubject::Contributor(contributor));
        }

        let username = content.author_username.as_deref()?.trim();
        if username.is_empty() {
            return None;
        }

        if let Some(contributor) = self.contributors.iter().find(|c| c.handle == username) {
            return Some(AuthorSubject::Contributor(contributor));
        }

        Some(AuthorSubject::RawUsername {
            username: username.to_string(),
            profile: self.users.get(username),
        })
    }

    /// Every author that gets a page.
    ///
    /// All contributors in input order, then raw usernames from non-draft
    /// content, sorted.
    pub fn subjects(&self, contents: &[Content]) -> Vec<AuthorSubject<'a>> {
        let mut subjects: Vec<AuthorSubject<'a>> = self
            .contributors
            .iter()
            .map(AuthorSubject::Contributor)
            .collect();

        let usernames: BTreeSet<String> = contents
            .iter()
            .filter(|c| !c.draft)
            .filter_map(|c| match self.attribute(c) {
                Some(AuthorSubject::RawUsername { username, .. }) => Some(username),
                _ => None,
            })
            .collect();

        subjects.extend(usernames.into_iter().map(|username| {
            let profile = self.users.get(&username);
            AuthorSubject::RawUsername { username, profile }
        }));

        subjects
    }
}

/// Keep URL-safe handles as they are; slugify anything else.
fn url_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !trimmed.starts_with('.')
    {
        trimmed.to_string()
    } else {
        slugify(trimmed)
    }
}
