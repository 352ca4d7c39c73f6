// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The demo keeps two copies of a shopping list in sync: every change made to the first copy
//! is captured as a diff record, shipped as JSON text, and replayed against the second copy.

use std::{cell::RefCell, error::Error, rc::Rc};
use tomes::{Diff, Event, EventKind, Tree};

fn main() -> Result<(), Box<dyn Error>> {
    // Both copies start from the same state.
    let initial = serde_json::json!({
        "owner": "alice",
        "items": ["milk", "eggs"],
        "budget": 20
    });
    let mut local = Tree::new(initial.clone())?;
    let mut remote = Tree::new(initial)?;

    // --- Capture ---
    // The root emits a diff event after every mutation (or once per batch while paused). We
    // serialize each record as it arrives; in a real application this is where it would be
    // handed to the network.
    let outbox = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = Rc::clone(&outbox);
    local.on(local.root(), EventKind::Diff, move |event| {
        if let Event::Diff(diff) = event {
            match serde_json::to_string(diff) {
                Ok(text) => sink.borrow_mut().push(text),
                Err(e) => eprintln!("dropping unserializable diff: {e}"),
            }
        }
    })?;

    // --- Observe ---
    // Structural events tell us which keys changed without diffing values ourselves.
    let items = local
        .get(local.root(), "items")?
        .ok_or("the list has items")?;
    local.on(items, EventKind::Add, |event| println!("local items: {event}"))?;

    // --- Mutate ---
    local.push(items, ["bread"])?;
    let budget = local
        .get(local.root(), "budget")?
        .ok_or("the list has a budget")?;

    // A batch: both changes reach the outbox as a single record.
    local.pause();
    local.inc(budget, -4.5)?;
    local.set(local.root(), "shared_with", "bob")?;
    local.resume();

    // --- Replay ---
    let records = outbox
        .borrow()
        .iter()
        .map(|text| serde_json::from_str::<Diff>(text))
        .collect::<Result<Vec<_>, _>>()?;
    for text in outbox.borrow().iter() {
        println!("wire: {text}");
    }
    remote.consume(&records)?;

    let local_json = local.to_json(local.root())?;
    let remote_json = remote.to_json(remote.root())?;
    println!("local:  {local_json}");
    println!("remote: {remote_json}");
    assert_eq!(local_json, remote_json);
    Ok(())
}
