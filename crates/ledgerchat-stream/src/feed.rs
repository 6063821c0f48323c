//! Caller-side feed assembly.

use std::collections::HashMap;

use ledgerchat_shared::types::Message;

/// Merge a delivered batch into an existing feed.
///
/// Messages are keyed by id. A later copy replaces the earlier one but keeps
/// its position, then the feed is stably sorted by timestamp so equal
/// timestamps stay in arrival order.
pub fn merge_feed(existing: Vec<Message>, batch: Vec<Message>) -> Vec<Message> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(existing.len() + batch.len());
    let mut feed: Vec<Message> = Vec::with_capacity(existing.len() + batch.len());

    for msg in existing.into_iter().chain(batch) {
        match index.get(&msg.id) {
            Some(&i) => feed[i] = msg,
            None => {
                index.insert(msg.id.clone(), feed.len());
                feed.push(msg);
            }
        }
    }

    feed.sort_by_key(|m| m.timestamp);
    feed
}
