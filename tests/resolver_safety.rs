use agendaBot::models::KnownEntity;
use agendaBot::service::resolver::{contains_id, resolve, Resolution};

fn snapshot() -> Vec<KnownEntity> {
    vec![
        KnownEntity::new("123", "Write newsletter about GPT-4"),
        KnownEntity::new("456", "Write post for AI_Devs course"),
        KnownEntity::new("789", "Buy milk"),
    ]
}

#[test]
fn resolves_mention_by_lexical_overlap() {
    let result = resolve("Beside milk I need to buy sugar", &snapshot());
    match result {
        Resolution::Match { id, .. } => assert_eq!(id, "789"),
        other => panic!("expected a match, got {:?}", other),
    }
}

#[test]
fn resolves_updated_row_text() {
    let result = resolve("Buy milk and sugar", &snapshot());
    match result {
        Resolution::Match { id, .. } => assert_eq!(id, "789"),
        other => panic!("expected a match, got {:?}", other),
    }
}

#[test]
fn unrelated_mention_is_not_found() {
    assert_eq!(resolve("water the plants", &snapshot()), Resolution::NotFound);
}

#[test]
fn empty_snapshot_is_not_found() {
    assert_eq!(resolve("buy milk", &[]), Resolution::NotFound);
}

#[test]
fn near_ties_are_reported_as_ambiguous() {
    let snapshot = vec![
        KnownEntity::new("1", "Write newsletter about GPT-4"),
        KnownEntity::new("2", "Write newsletter about Claude"),
    ];
    match resolve("write the newsletter", &snapshot) {
        Resolution::Ambiguous { candidates } => {
            let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
            assert!(ids.contains(&"1"));
            assert!(ids.contains(&"2"));
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
}

#[test]
fn clear_winner_beats_a_weak_runner_up() {
    let snapshot = vec![
        KnownEntity::new("1", "Buy milk"),
        KnownEntity::new("2", "Buy a new laptop for work"),
    ];
    match resolve("need to buy milk today", &snapshot) {
        Resolution::Match { id, .. } => assert_eq!(id, "1"),
        other => panic!("expected a match, got {:?}", other),
    }
}

// Cheap deterministic generator, enough to fuzz the membership invariant
// without pulling in a dependency.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn pick<'a>(&mut self, pool: &[&'a str]) -> &'a str {
        pool[(self.next() % pool.len() as u64) as usize]
    }
}

#[test]
fn resolver_never_fabricates_an_id() {
    let pool = [
        "write", "buy", "call", "milk", "sugar", "newsletter", "course", "mom", "meeting",
        "report", "plants", "laptop", "gpt", "email", "review",
    ];
    let mut rng = XorShift(0x9E3779B97F4A7C15);

    for round in 0..250 {
        let entries = 1 + (rng.next() % 5) as usize;
        let snapshot: Vec<KnownEntity> = (0..entries)
            .map(|i| {
                let words = 1 + (rng.next() % 4) as usize;
                let text: Vec<&str> = (0..words).map(|_| rng.pick(&pool)).collect();
                KnownEntity::new(format!("id-{round}-{i}"), text.join(" "))
            })
            .collect();
        let mention_words = 1 + (rng.next() % 6) as usize;
        let mention: Vec<&str> = (0..mention_words).map(|_| rng.pick(&pool)).collect();
        let mention = mention.join(" ");

        match resolve(&mention, &snapshot) {
            Resolution::Match { id, .. } => {
                assert!(contains_id(&id, &snapshot), "fabricated id {id}");
            }
            Resolution::Ambiguous { candidates } => {
                for candidate in candidates {
                    assert!(contains_id(&candidate.id, &snapshot));
                }
            }
            Resolution::NotFound => {}
        }
    }
}
