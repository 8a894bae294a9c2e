//! Conversation list: one entry per counterpart with the latest message.
//!
//! A conversation is never stored. It is derived from the messages a user
//! sent or received: every distinct counterpart gets exactly one entry, and
//! that entry carries the newest message exchanged with them in either
//! direction. Entries come back newest conversation first.
//!
//! The aggregation runs in one pass over all messages involving the user.
//! Deduplicating each direction separately before merging can hide the true
//! latest message, so the directional merge is only kept as
//! [`merge_directional`] for callers that already hold two such lists.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::db::{Message, User, UserResponse};

/// Counterpart profile plus the most recent message exchanged with them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub user: UserResponse,
    pub last_message: Message,
}

/// Whether `candidate` should replace `current` as the latest message.
///
/// Strictly newer wins. Equal timestamps fall back to the larger id so the
/// outcome never depends on input order.
fn supersedes(candidate: &Message, current: &Message) -> bool {
    match candidate.created_at.cmp(&current.created_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.id > current.id,
    }
}

fn newest_first(mut latest: HashMap<String, Message>) -> Vec<(String, Message)> {
    let mut entries: Vec<(String, Message)> = latest.drain().collect();
    entries.sort_by(|(_, a), (_, b)| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    entries
}

/// Latest message per counterpart of `user_id`, newest conversation first.
///
/// Messages the user took no part in are ignored. A message the user sent
/// to themselves forms a conversation with themselves.
pub fn latest_per_counterpart(
    user_id: &str,
    messages: impl IntoIterator<Item = Message>,
) -> Vec<(String, Message)> {
    let mut latest: HashMap<String, Message> = HashMap::new();

    for message in messages {
        let Some(counterpart) = message.counterpart_of(user_id) else {
            continue;
        };

        let replace = match latest.get(counterpart) {
            Some(current) => supersedes(&message, current),
            None => true,
        };
        if replace {
            let key = counterpart.to_string();
            latest.insert(key, message);
        }
    }

    newest_first(latest)
}

/// Merge one-per-counterpart sent and received lists.
///
/// Sent messages are keyed by receiver. A received message takes over the
/// entry for its sender only when there is none yet or the existing one is
/// strictly older. The result is sorted newest conversation first.
pub fn merge_directional(sent: Vec<Message>, received: Vec<Message>) -> Vec<(String, Message)> {
    let mut latest: HashMap<String, Message> = HashMap::new();

    for message in sent {
        latest.insert(message.receiver_id.clone(), message);
    }

    for message in received {
        let replace = match latest.get(&message.sender_id) {
            None => true,
            Some(existing) => existing.created_at < message.created_at,
        };
        if replace {
            latest.insert(message.sender_id.clone(), message);
        }
    }

    newest_first(latest)
}

/// Conversation list for a user, newest first.
///
/// Read-only. Storage errors are returned unchanged.
pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> Result<Vec<Conversation>, sqlx::Error> {
    let messages = Message::list_involving(db, user_id).await?;
    let message_count = messages.len();
    let latest = latest_per_counterpart(user_id, messages);

    let counterpart_ids: Vec<String> = latest.iter().map(|(id, _)| id.clone()).collect();
    let mut users: HashMap<String, UserResponse> = User::find_many(db, &counterpart_ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), UserResponse::from(u)))
        .collect();

    let conversations: Vec<Conversation> = latest
        .into_iter()
        .filter_map(|(counterpart_id, last_message)| {
            match users.remove(&counterpart_id) {
                Some(user) => Some(Conversation { user, last_message }),
                None => {
                    warn!(counterpart_id = %counterpart_id, "Skipping conversation with unknown user");
                    None
                }
            }
        })
        .collect();

    debug!(
        user_id = %user_id,
        messages = message_count,
        conversations = conversations.len(),
        "Aggregated conversations"
    );

    Ok(conversations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory, Role};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(id: &str, from: &str, to: &str, t: i64) -> Message {
        Message {
            id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            body: format!("{} -> {}", from, to),
            created_at: at(t),
        }
    }

    #[test]
    fn test_no_messages_yields_no_conversations() {
        assert!(latest_per_counterpart("u", Vec::new()).is_empty());
        assert!(latest_per_counterpart("u", vec![msg("m1", "a", "b", 1)]).is_empty());
    }

    #[test]
    fn test_received_later_wins() {
        let result = latest_per_counterpart("u", vec![msg("s", "u", "c", 1), msg("r", "c", "u", 5)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "c");
        assert_eq!(result[0].1.id, "r");
        assert_eq!(result[0].1.created_at, at(5));
    }

    #[test]
    fn test_sent_later_is_kept() {
        let result = latest_per_counterpart("u", vec![msg("s", "u", "c", 5), msg("r", "c", "u", 1)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1.id, "s");
    }

    #[test]
    fn test_only_sent_message() {
        let result = latest_per_counterpart("u", vec![msg("s", "u", "c", 3)]);
        assert_eq!(result, vec![("c".to_string(), msg("s", "u", "c", 3))]);
    }

    #[test]
    fn test_true_latest_across_many_messages_in_one_direction() {
        let messages = vec![
            msg("s1", "u", "c", 1),
            msg("s9", "u", "c", 9),
            msg("s4", "u", "c", 4),
            msg("r7", "c", "u", 7),
            msg("r2", "c", "u", 2),
        ];
        let result = latest_per_counterpart("u", messages);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1.id, "s9");
    }

    #[test]
    fn test_one_entry_per_counterpart_sorted_newest_first() {
        let messages = vec![
            msg("a1", "u", "alice", 10),
            msg("b1", "bob", "u", 30),
            msg("c1", "carol", "u", 20),
            msg("a2", "alice", "u", 15),
        ];
        let result = latest_per_counterpart("u", messages);
        let order: Vec<&str> = result.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["bob", "carol", "alice"]);
        assert_eq!(result[2].1.id, "a2");
    }

    #[test]
    fn test_equal_timestamps_independent_of_input_order() {
        let forward = latest_per_counterpart("u", vec![msg("m-a", "u", "c", 5), msg("m-b", "c", "u", 5)]);
        let backward = latest_per_counterpart("u", vec![msg("m-b", "c", "u", 5), msg("m-a", "u", "c", 5)]);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].1.id, "m-b");
    }

    #[test]
    fn test_message_to_self() {
        let result = latest_per_counterpart("u", vec![msg("note", "u", "u", 1)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "u");
    }

    #[test]
    fn test_merge_directional_replaces_only_when_strictly_newer() {
        let result = merge_directional(vec![msg("s", "u", "c", 1)], vec![msg("r", "c", "u", 5)]);
        assert_eq!(result[0].1.id, "r");

        let result = merge_directional(vec![msg("s", "u", "c", 5)], vec![msg("r", "c", "u", 1)]);
        assert_eq!(result[0].1.id, "s");

        let result = merge_directional(vec![msg("s", "u", "c", 5)], vec![msg("r", "c", "u", 5)]);
        assert_eq!(result[0].1.id, "s");
    }

    #[test]
    fn test_merge_directional_received_only() {
        let result = merge_directional(Vec::new(), vec![msg("r", "c", "u", 2), msg("q", "d", "u", 3)]);
        let order: Vec<&str> = result.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["d", "c"]);
    }

    #[tokio::test]
    async fn test_list_for_user_attaches_counterpart_profiles() {
        let db = init_memory().await.unwrap();
        let me = User::create(&db, "me@example.com", "h", Some("Me"), None, Role::User).await.unwrap();
        let host = User::create(&db, "host@example.com", "h", Some("Host"), None, Role::User)
            .await
            .unwrap();
        let seller = User::create(&db, "seller@example.com", "h", Some("Seller"), None, Role::User)
            .await
            .unwrap();

        Message::create(&db, &me.id, &host.id, "Is the room free in July?").await.unwrap();
        Message::create(&db, &host.id, &me.id, "Yes it is").await.unwrap();
        Message::create(&db, &seller.id, &me.id, "Still interested in the car?").await.unwrap();

        let conversations = list_for_user(&db, &me.id).await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].user.id, seller.id);
        assert_eq!(conversations[0].last_message.body, "Still interested in the car?");
        assert_eq!(conversations[1].user.name.as_deref(), Some("Host"));
        assert_eq!(conversations[1].last_message.body, "Yes it is");

        let host_view = list_for_user(&db, &host.id).await.unwrap();
        assert_eq!(host_view.len(), 1);
        assert_eq!(host_view[0].user.id, me.id);
    }

    #[tokio::test]
    async fn test_list_for_user_without_messages() {
        let db = init_memory().await.unwrap();
        let loner = User::create(&db, "loner@example.com", "h", None, None, Role::User).await.unwrap();
        assert!(list_for_user(&db, &loner.id).await.unwrap().is_empty());
    }
}
