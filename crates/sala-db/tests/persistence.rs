/// The store survives a restart: reopening the same file sees the rows written
/// before, and migrations do not run twice.

use sala_db::Database;
use sala_db::models::MessageRow;

#[test]
fn reopen_keeps_participants_and_messages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sala.db");

    {
        let db = Database::open(&path).unwrap();
        let join = MessageRow {
            id: "join-ana".into(),
            sender: "Ana".into(),
            recipient: "Todos".into(),
            body: "entra na sala...".into(),
            kind: "status".into(),
            time: "09:30:00".into(),
        };
        assert!(db.create_participant("Ana", 1_000, &join).unwrap());
        // db is dropped here, closing the connection
    }

    let db = Database::open(&path).unwrap();
    let people = db.list_participants().unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].name, "Ana");
    assert_eq!(people[0].last_status, 1_000);

    let messages = db.messages_visible_to("Bia", "Todos", None).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "entra na sala...");

    // name is still taken after the restart
    let again = MessageRow { id: "join-ana-2".into(), ..messages[0].clone() };
    assert!(!db.create_participant("Ana", 2_000, &again).unwrap());
}
