//! Related content and series navigation.

use std::collections::HashSet;

use pressroom_core::{BlocksConfig, model::KindFamily};
use tracing::warn;

use crate::page::RenderedContent;

/// Blocks computed for one content item.
#[derive(Debug, Clone, Default)]
pub struct GeneratedBlocks<'a> {
    /// Related items for standalone content.
    pub related: Vec<&'a RenderedContent<'a>>,

    /// Navigation for series members.
    pub series: Option<SeriesNavigation<'a>>,
}

impl GeneratedBlocks<'_> {
    pub fn is_empty(&self) -> bool {
        self.related.is_empty() && self.series.is_none()
    }
}

/// Position of an item inside its series.
#[derive(Debug, Clone)]
pub struct SeriesNavigation<'a> {
    pub name: String,
    pub prev: Option<&'a RenderedContent<'a>>,
    pub next: Option<&'a RenderedContent<'a>>,

    /// Items after the current one, in series order.
    pub forward: Vec<&'a RenderedContent<'a>>,

    /// Items before the current one, nearest first.
    pub backward: Vec<&'a RenderedContent<'a>>,
}

/// Computes blocks from the pre-rendered content set.
#[derive(Debug, Clone)]
pub struct BlocksEngine {
    config: BlocksConfig,
}

impl BlocksEngine {
    #[must_use]
    pub fn new(config: BlocksConfig) -> Self {
        Self { config }
    }

    /// Build the blocks of `current` against every rendered item.
    pub fn build<'a>(
        &self,
        current: &RenderedContent<'_>,
        all: &'a [RenderedContent<'a>],
    ) -> GeneratedBlocks<'a> {
        if !self.config.enabled {
            return GeneratedBlocks::default();
        }

        if current.content.in_series() {
            return self.series_blocks(current, all);
        }

        GeneratedBlocks {
            related: self.related(current, all),
            series: None,
        }
    }

    fn series_blocks<'a>(
        &self,
        current: &RenderedContent<'_>,
        all: &'a [RenderedContent<'a>],
    ) -> GeneratedBlocks<'a> {
        let name = current.content.series.as_str();
        let mut members: Vec<&RenderedContent<'a>> =
            all.iter().filter(|r| r.content.series == name).collect();
        members.sort_by_key(|r| r.content.series_order);

        let Some(pos) = members.iter().position(|r| r.id() == current.id()) else {
            warn!(
                content = current.id(),
                series = name,
                "content not found in its own series, skipping blocks"
            );
            return GeneratedBlocks::default();
        };

        let max = self.config.max_items;
        let forward = members[pos + 1..].iter().take(max).copied().collect();
        let backward = members[..pos].iter().rev().take(max).copied().collect();

        GeneratedBlocks {
            related: Vec::new(),
            series: Some(SeriesNavigation {
                name: name.to_string(),
                prev: pos.checked_sub(1).map(|i| members[i]),
                next: members.get(pos + 1).copied(),
                forward,
                backward,
            }),
        }
    }

    fn related<'a>(
        &self,
        current: &RenderedContent<'_>,
        all: &'a [RenderedContent<'a>],
    ) -> Vec<&'a RenderedContent<'a>> {
        let max = self.config.max_items;
        let own = match current.content.kind.family() {
            Some(KindFamily::Blog) => KindFamily::Blog,
            _ => KindFamily::Article,
        };
        let other = match own {
            KindFamily::Blog => KindFamily::Article,
            KindFamily::Article => KindFamily::Blog,
        };
        let section = current.content.section_id;

        let mut selected: Vec<&'a RenderedContent<'a>> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();

        fill_tier(current, all, max, &mut seen, &mut selected, |c| {
            c.content.section_id == section && c.content.kind.family() == Some(own)
        });
        fill_tier(current, all, max, &mut seen, &mut selected, |c| {
            c.content.section_id == section && c.content.kind.family() == Some(other)
        });
        if self.config.multi_section {
            fill_tier(current, all, max, &mut seen, &mut selected, |c| {
                c.content.section_id != section
            });
        }

        selected
    }
}

/// Append unseen candidates that share a tag with `current` and pass `accept`.
fn fill_tier<'a>(
    current: &RenderedContent<'_>,
    all: &'a [RenderedContent<'a>],
    max: usize,
    seen: &mut HashSet<i64>,
    selected: &mut Vec<&'a RenderedContent<'a>>,
    accept: impl Fn(&RenderedContent<'a>) -> bool,
) {
    for candidate in all {
        if selected.len() >= max {
            break;
        }
        if candidate.id() == current.id()
            || seen.contains(&candidate.id())
            || !candidate.content.shares_tag_with(current.content)
            || !accept(candidate)
        {
            continue;
        }
        seen.insert(candidate.id());
        selected.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pressroom_core::{Content, ContentKind, ContentMeta, Tag};

    use super::*;

    fn tag(id: i64) -> Tag {
        Tag {
            id,
            site_id: 1,
            name: format!("t{id}"),
            slug: format!("t{id}"),
        }
    }

    fn content(id: i64, kind: ContentKind, section_id: i64, tags: &[i64]) -> Content {
        Content {
            id,
            site_id: 1,
            section_id,
            short_id: format!("s{id}"),
            kind,
            heading: format!("Item {id}"),
            summary: String::new(),
            body: String::new(),
            draft: false,
            featured: false,
            series: String::new(),
            series_order: 0,
            published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            tags: tags.iter().map(|t| tag(*t)).collect(),
            contributor_id: None,
            author_username: None,
            image: None,
            meta: ContentMeta::default(),
        }
    }

    fn rendered(items: &[Content]) -> Vec<RenderedContent<'_>> {
        items
            .iter()
            .map(|c| RenderedContent {
                content: c,
                html: String::new(),
                url: format!("/{}/", c.slug()),
                section_path: String::new(),
            })
            .collect()
    }

    fn config(multi_section: bool, max_items: usize) -> BlocksConfig {
        BlocksConfig {
            enabled: true,
            multi_section,
            max_items,
        }
    }

    fn ids(items: &[&RenderedContent<'_>]) -> Vec<i64> {
        items.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_tier_ordering() {
        let items = vec![
            content(1, ContentKind::Article, 1, &[1]),
            content(2, ContentKind::Article, 1, &[1]),
            content(3, ContentKind::Blog, 1, &[1]),
            content(4, ContentKind::Article, 2, &[1]),
        ];
        let all = rendered(&items);

        let blocks = BlocksEngine::new(config(true, 2)).build(&all[0], &all);
        assert_eq!(ids(&blocks.related), vec![2, 3]);
        assert!(blocks.series.is_none());
    }

    #[test]
    fn test_other_family_and_sections() {
        let items = vec![
            content(1, ContentKind::Blog, 1, &[1]),
            content(2, ContentKind::Article, 2, &[1]),
            content(3, ContentKind::Post, 1, &[1]),
            content(4, ContentKind::Blog, 1, &[1]),
            content(5, ContentKind::Page, 1, &[1]),
        ];
        let all = rendered(&items);

        let blocks = BlocksEngine::new(config(false, 10)).build(&all[0], &all);
        assert_eq!(ids(&blocks.related), vec![4, 3]);

        let blocks = BlocksEngine::new(config(true, 10)).build(&all[0], &all);
        assert_eq!(ids(&blocks.related), vec![4, 3, 2]);
    }

    #[test]
    fn test_requires_shared_tag_id() {
        let mut items = vec![
            content(1, ContentKind::Article, 1, &[1]),
            content(2, ContentKind::Article, 1, &[2]),
            content(3, ContentKind::Article, 1, &[]),
        ];
        // Same name as tag 1 but a different id.
        items[1].tags[0].name = "t1".to_string();
        let all = rendered(&items);

        let blocks = BlocksEngine::new(config(true, 5)).build(&all[0], &all);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_disabled() {
        let items = vec![
            content(1, ContentKind::Article, 1, &[1]),
            content(2, ContentKind::Article, 1, &[1]),
        ];
        let all = rendered(&items);
        let mut cfg = config(true, 5);
        cfg.enabled = false;

        assert!(BlocksEngine::new(cfg).build(&all[0], &all).is_empty());
    }

    #[test]
    fn test_series_navigation() {
        let mut items = vec![
            content(1, ContentKind::Article, 1, &[]),
            content(2, ContentKind::Article, 1, &[]),
            content(3, ContentKind::Article, 1, &[]),
        ];
        for (item, order) in items.iter_mut().zip([3, 1, 2]) {
            item.series = "s".to_string();
            item.series_order = order;
        }
        let all = rendered(&items);

        // Item 3 has order 2.
        let blocks = BlocksEngine::new(config(false, 5)).build(&all[2], &all);
        let nav = blocks.series.expect("series navigation");
        assert_eq!(nav.prev.map(|r| r.content.series_order), Some(1));
        assert_eq!(nav.next.map(|r| r.content.series_order), Some(3));
        assert_eq!(ids(&nav.forward), vec![1]);
        assert_eq!(ids(&nav.backward), vec![2]);
        assert!(blocks.related.is_empty());
    }

    #[test]
    fn test_series_indexes_truncated() {
        let mut items: Vec<Content> = (1..=6)
            .map(|i| content(i, ContentKind::Article, 1, &[]))
            .collect();
        for item in &mut items {
            item.series = "long".to_string();
            item.series_order = item.id as i32;
        }
        let all = rendered(&items);

        let blocks = BlocksEngine::new(config(false, 2)).build(&all[3], &all);
        let nav = blocks.series.expect("series navigation");
        assert_eq!(ids(&nav.forward), vec![5, 6]);
        assert_eq!(ids(&nav.backward), vec![3, 2]);
    }

    #[test]
    fn test_missing_from_own_series() {
        let mut items = vec![
            content(1, ContentKind::Article, 1, &[]),
            content(2, ContentKind::Article, 1, &[]),
        ];
        items[0].series = "s".to_string();
        items[1].series = "s".to_string();
        let all = rendered(&items);

        let mut stray = content(9, ContentKind::Article, 1, &[]);
        stray.series = "s".to_string();
        let current = RenderedContent {
            content: &stray,
            html: String::new(),
            url: String::new(),
            section_path: String::new(),
        };

        assert!(BlocksEngine::new(config(false, 5)).build(&current, &all).is_empty());
    }
}
