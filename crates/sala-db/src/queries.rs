use crate::models::{MessageRow, Mutation, ParticipantRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, params};

impl Database {
    // -- Participants --

    /// Insert a participant together with its join notice, in one transaction.
    /// Returns `false` and writes nothing when the name is already taken.
    pub fn create_participant(&self, name: &str, now_ms: i64, join: &MessageRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            match tx.execute(
                "INSERT INTO participants (name, last_status) VALUES (?1, ?2)",
                params![name, now_ms],
            ) {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
            insert_message_row(&tx, join)?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn list_participants(&self) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT name, last_status FROM participants ORDER BY rowid")?;
            let rows = stmt
                .query_map([], map_participant)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn participant_exists(&self, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM participants WHERE name = ?1", [name], |row| {
                    row.get::<_, i64>(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Heartbeat. Returns `false` if nobody is registered under `name`.
    pub fn touch_participant(&self, name: &str, now_ms: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE participants SET last_status = ?2 WHERE name = ?1",
                params![name, now_ms],
            )?;
            Ok(changed > 0)
        })
    }

    /// Participants whose last heartbeat is at or before `cutoff_ms`.
    pub fn stale_participants(&self, cutoff_ms: i64) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, last_status FROM participants
                 WHERE last_status <= ?1
                 ORDER BY last_status, rowid",
            )?;
            let rows = stmt
                .query_map([cutoff_ms], map_participant)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Remove a participant and append its departure notice atomically.
    ///
    /// The delete only matches while `last_status` still equals the value the
    /// caller read, so a heartbeat in between keeps the participant alive and
    /// this returns `false` without writing anything.
    pub fn evict_participant(
        &self,
        name: &str,
        seen_last_status: i64,
        departure: &MessageRow,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM participants WHERE name = ?1 AND last_status = ?2",
                params![name, seen_last_status],
            )?;
            if removed == 0 {
                return Ok(false);
            }
            insert_message_row(&tx, departure)?;
            tx.commit()?;
            Ok(true)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| insert_message_row(conn, message))
    }

    /// Insert a message only if its sender is a live participant. The check and
    /// the insert hold the same lock, so a sweep cannot evict the sender in
    /// between. Returns `false` and writes nothing for an unknown sender.
    pub fn insert_message_from_participant(&self, message: &MessageRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let live = conn
                .query_row(
                    "SELECT 1 FROM participants WHERE name = ?1",
                    [&message.sender],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if live.is_none() {
                return Ok(false);
            }
            insert_message_row(conn, message)?;
            Ok(true)
        })
    }

    /// Messages addressed to `viewer`, sent by `viewer`, or sent to `broadcast`,
    /// oldest first. With a limit, only the most recent `limit` of them are
    /// returned (still oldest first).
    pub fn messages_visible_to(
        &self,
        viewer: &str,
        broadcast: &str,
        limit: Option<u64>,
    ) -> Result<Vec<MessageRow>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit
            .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender, recipient, body, kind, time FROM (
                     SELECT seq, id, sender, recipient, body, kind, time
                     FROM messages
                     WHERE recipient = ?1 OR sender = ?1 OR recipient = ?2
                     ORDER BY seq DESC
                     LIMIT ?3
                 )
                 ORDER BY seq ASC",
            )?;
            let rows = stmt
                .query_map(params![viewer, broadcast, limit], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, sender, recipient, body, kind, time FROM messages WHERE id = ?1",
                    [id],
                    map_message,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Delete a message if `requester` wrote it. The ownership check and the
    /// delete run under the same lock.
    pub fn delete_message(&self, id: &str, requester: &str) -> Result<Mutation> {
        self.with_conn_mut(|conn| {
            match check_author(conn, id, requester)? {
                Mutation::Applied => {}
                refused => return Ok(refused),
            }
            conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(Mutation::Applied)
        })
    }

    /// Replace recipient, body and kind of a message if `requester` wrote it.
    /// `id`, sender and time are left untouched.
    pub fn update_message(
        &self,
        id: &str,
        requester: &str,
        recipient: &str,
        body: &str,
        kind: &str,
    ) -> Result<Mutation> {
        self.with_conn_mut(|conn| {
            match check_author(conn, id, requester)? {
                Mutation::Applied => {}
                refused => return Ok(refused),
            }
            conn.execute(
                "UPDATE messages SET recipient = ?2, body = ?3, kind = ?4 WHERE id = ?1",
                params![id, recipient, body, kind],
            )?;
            Ok(Mutation::Applied)
        })
    }
}

fn insert_message_row(conn: &Connection, m: &MessageRow) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, sender, recipient, body, kind, time) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![m.id, m.sender, m.recipient, m.body, m.kind, m.time],
    )?;
    Ok(())
}

/// `Applied` here means "requester may proceed".
fn check_author(conn: &Connection, id: &str, requester: &str) -> Result<Mutation> {
    let sender: Option<String> = conn
        .query_row("SELECT sender FROM messages WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;

    Ok(match sender {
        None => Mutation::NotFound,
        Some(sender) if sender != requester => Mutation::NotAuthor,
        Some(_) => Mutation::Applied,
    })
}

fn map_participant(row: &rusqlite::Row<'_>) -> rusqlite::Result<ParticipantRow> {
    Ok(ParticipantRow {
        name: row.get(0)?,
        last_status: row.get(1)?,
    })
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        body: row.get(3)?,
        kind: row.get(4)?,
        time: row.get(5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &str = "Todos";

    fn row(id: &str, sender: &str, recipient: &str, body: &str, kind: &str) -> MessageRow {
        MessageRow {
            id: id.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            body: body.into(),
            kind: kind.into(),
            time: "10:00:00".into(),
        }
    }

    fn ids(rows: &[MessageRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn duplicate_name_is_rejected_without_side_effects() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.create_participant("Ana", 1_000, &row("j1", "Ana", ALL, "entra", "status")).unwrap());
        assert!(!db.create_participant("Ana", 2_000, &row("j2", "Ana", ALL, "entra", "status")).unwrap());

        let people = db.list_participants().unwrap();
        assert_eq!(people, vec![ParticipantRow { name: "Ana".into(), last_status: 1_000 }]);
        // the rolled-back join notice must not exist
        assert!(db.get_message("j2").unwrap().is_none());
        assert!(db.get_message("j1").unwrap().is_some());
    }

    #[test]
    fn names_are_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_participant("ana", 1, &row("a", "ana", ALL, "x", "status")).unwrap());
        assert!(db.create_participant("Ana", 1, &row("b", "Ana", ALL, "x", "status")).unwrap());
        assert_eq!(db.list_participants().unwrap().len(), 2);
    }

    #[test]
    fn touch_reports_unknown_participant() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.touch_participant("ghost", 5).unwrap());

        db.create_participant("Ana", 1, &row("a", "Ana", ALL, "x", "status")).unwrap();
        assert!(db.touch_participant("Ana", 5).unwrap());
        assert_eq!(db.list_participants().unwrap()[0].last_status, 5);
        assert!(db.participant_exists("Ana").unwrap());
        assert!(!db.participant_exists("ana").unwrap());
    }

    #[test]
    fn stale_query_uses_inclusive_cutoff() {
        let db = Database::open_in_memory().unwrap();
        db.create_participant("old", 100, &row("a", "old", ALL, "x", "status")).unwrap();
        db.create_participant("edge", 200, &row("b", "edge", ALL, "x", "status")).unwrap();
        db.create_participant("fresh", 300, &row("c", "fresh", ALL, "x", "status")).unwrap();

        let stale: Vec<String> = db
            .stale_participants(200)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(stale, vec!["old", "edge"]);
    }

    #[test]
    fn eviction_skips_participant_that_sent_heartbeat() {
        let db = Database::open_in_memory().unwrap();
        db.create_participant("Ana", 100, &row("a", "Ana", ALL, "x", "status")).unwrap();

        let stale = db.stale_participants(150).unwrap();
        assert_eq!(stale.len(), 1);

        // heartbeat lands between the query and the delete
        db.touch_participant("Ana", 160).unwrap();

        let leave = row("leave", "Ana", ALL, "sai", "status");
        assert!(!db.evict_participant("Ana", stale[0].last_status, &leave).unwrap());
        assert!(db.participant_exists("Ana").unwrap());
        assert!(db.get_message("leave").unwrap().is_none());
    }

    #[test]
    fn eviction_writes_departure_notice() {
        let db = Database::open_in_memory().unwrap();
        db.create_participant("Ana", 100, &row("a", "Ana", ALL, "x", "status")).unwrap();

        let leave = row("leave", "Ana", ALL, "sai", "status");
        assert!(db.evict_participant("Ana", 100, &leave).unwrap());
        assert!(!db.participant_exists("Ana").unwrap());
        assert_eq!(db.get_message("leave").unwrap(), Some(leave));
    }

    #[test]
    fn visibility_filters_private_messages() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&row("1", "Ana", ALL, "oi", "message")).unwrap();
        db.insert_message(&row("2", "Ana", "Bia", "psiu", "private_message")).unwrap();
        db.insert_message(&row("3", "Bia", "Ana", "oi Ana", "private_message")).unwrap();
        db.insert_message(&row("4", "Caio", "Bia", "segredo", "private_message")).unwrap();

        assert_eq!(ids(&db.messages_visible_to("Ana", ALL, None).unwrap()), vec!["1", "2", "3"]);
        assert_eq!(ids(&db.messages_visible_to("Bia", ALL, None).unwrap()), vec!["1", "2", "3", "4"]);
        assert_eq!(ids(&db.messages_visible_to("Caio", ALL, None).unwrap()), vec!["1", "4"]);
        assert_eq!(ids(&db.messages_visible_to("Davi", ALL, None).unwrap()), vec!["1"]);
    }

    #[test]
    fn limit_keeps_most_recent_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        for id in ["1", "2", "3", "4"] {
            db.insert_message(&row(id, "Ana", ALL, "oi", "message")).unwrap();
        }
        db.insert_message(&row("5", "Bia", "Caio", "psiu", "private_message")).unwrap();

        assert_eq!(ids(&db.messages_visible_to("Ana", ALL, Some(2)).unwrap()), vec!["3", "4"]);
        assert_eq!(ids(&db.messages_visible_to("Ana", ALL, Some(10)).unwrap()), vec!["1", "2", "3", "4"]);
        // beyond i64 range, clamped rather than wrapped negative
        assert_eq!(ids(&db.messages_visible_to("Ana", ALL, Some(u64::MAX)).unwrap()), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn message_from_unknown_sender_is_not_stored() {
        let db = Database::open_in_memory().unwrap();
        db.create_participant("Ana", 1, &row("join", "Ana", ALL, "entra", "status")).unwrap();

        assert!(db.insert_message_from_participant(&row("m1", "Ana", ALL, "oi", "message")).unwrap());
        assert!(!db.insert_message_from_participant(&row("m2", "Ghost", ALL, "oi", "message")).unwrap());
        assert!(db.get_message("m1").unwrap().is_some());
        assert!(db.get_message("m2").unwrap().is_none());

        // once evicted, the same name can no longer post
        db.evict_participant("Ana", 1, &row("leave", "Ana", ALL, "sai", "status")).unwrap();
        assert!(!db.insert_message_from_participant(&row("m3", "Ana", ALL, "oi", "message")).unwrap());
        assert!(db.get_message("m3").unwrap().is_none());
    }

    #[test]
    fn only_author_may_mutate() {
        let db = Database::open_in_memory().unwrap();
        let original = row("m", "Ana", ALL, "oi", "message");
        db.insert_message(&original).unwrap();

        assert_eq!(db.delete_message("m", "Bia").unwrap(), Mutation::NotAuthor);
        assert_eq!(
            db.update_message("m", "Bia", "Caio", "hack", "private_message").unwrap(),
            Mutation::NotAuthor
        );
        assert_eq!(db.get_message("m").unwrap(), Some(original.clone()));

        assert_eq!(
            db.update_message("m", "Ana", "Bia", "editado", "private_message").unwrap(),
            Mutation::Applied
        );
        let updated = db.get_message("m").unwrap().unwrap();
        assert_eq!(updated.recipient, "Bia");
        assert_eq!(updated.body, "editado");
        assert_eq!(updated.kind, "private_message");
        assert_eq!(updated.sender, original.sender);
        assert_eq!(updated.time, original.time);

        assert_eq!(db.delete_message("m", "Ana").unwrap(), Mutation::Applied);
        assert_eq!(db.delete_message("m", "Ana").unwrap(), Mutation::NotFound);
        assert_eq!(db.update_message("m", "Ana", ALL, "x", "message").unwrap(), Mutation::NotFound);
    }
}
