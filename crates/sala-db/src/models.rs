/// Database row types — these map directly to SQLite rows.
/// Distinct from sala-types wire models to keep the DB layer independent.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    pub name: String,
    pub last_status: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub kind: String,
    pub time: String,
}

/// Result of an author-checked update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    NotFound,
    NotAuthor,
}
