//! Depth expansion
//!
//! Walks the already persisted link graph outward from the outlets' pages
//! and queues only the links that still need a fetch. Levels count pages:
//! an outlet's page is level 1, the targets of its links level 2, and so
//! on. The walk never touches the network.

use crate::crawler::frontier::{Frontier, WorkItem};
use crate::crawler::resolver::{resolve_or_mark_pending, Resolution};
use crate::storage::{GraphStore, LinkRecord, StorageResult, TargetState};
use std::collections::{HashSet, VecDeque};

/// Counters describing one expansion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionStats {
    /// Links examined
    pub visited: u64,
    /// Links pushed onto the frontier
    pub enqueued: u64,
    /// Unresolved links that turned out to be resolved since the snapshot
    pub late_resolved: u64,
    /// Links pushed because their target scrape failed
    pub retries: u64,
}

/// Expands `links`, which sit at `level`, up to `max_depth`
///
/// - An unresolved link is looked up again; if a successful scrape now
///   answers for its target it is attached and walked like a resolved
///   link, otherwise the link is queued.
/// - A link whose target failed is queued for a retry at any level.
/// - A link whose target succeeded is walked into its target's outgoing
///   links at `level + 1` while `level < max_depth`.
///
/// Each link is queued at most once per pass, and each scrape's outgoing
/// links are loaded at most once.
pub fn expand<S: GraphStore + ?Sized>(
    store: &mut S,
    frontier: &Frontier,
    links: Vec<LinkRecord>,
    level: u32,
    max_depth: u32,
) -> StorageResult<ExpansionStats> {
    let mut stats = ExpansionStats::default();
    let mut queued = HashSet::new();
    // Breadth first, so a scrape is first expanded at its lowest level
    let mut expanded = HashSet::new();
    let mut work: VecDeque<(LinkRecord, u32)> = links.into_iter().map(|l| (l, level)).collect();

    while let Some((link, level)) = work.pop_front() {
        stats.visited += 1;

        let descend_into = match link.target_state() {
            TargetState::Succeeded => link.scrape_target_id,
            TargetState::Failed => {
                if queued.insert(link.id) {
                    stats.retries += 1;
                    stats.enqueued += 1;
                    frontier.push(WorkItem::Link(link));
                }
                None
            }
            TargetState::Unresolved => match resolve_or_mark_pending(store, &link.url_target)? {
                Resolution::Resolved(scrape) => {
                    store.set_link_target(link.id, scrape.id)?;
                    stats.late_resolved += 1;
                    tracing::debug!("Link {} resolved late to scrape {}", link.id, scrape.id);
                    Some(scrape.id)
                }
                Resolution::Pending => {
                    if queued.insert(link.id) {
                        stats.enqueued += 1;
                        frontier.push(WorkItem::Link(link));
                    }
                    None
                }
            },
        };

        if let Some(target_id) = descend_into {
            if level < max_depth && expanded.insert(target_id) {
                for next in store.outgoing_links(target_id)? {
                    work.push_back((next, level + 1));
                }
            }
        }
    }

    Ok(stats)
}
