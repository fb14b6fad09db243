extern crate eventsheet as es;

use es::event::{Event, EventsList};
use es::expression::Expression;
use es::instruction::Instruction;

fn key_pressed(key: &str) -> Instruction {
    let mut instruction = Instruction::new("KeyPressed");
    instruction.set_parameter(0, Expression::new(format!("\"{}\"", key)));
    instruction
}

fn sample_event() -> Event {
    let mut event = Event::standard();
    {
        let mut conditions = event.condition_lists_mut();
        conditions[0].push(key_pressed("Space"));
    }
    {
        let mut actions = event.action_lists_mut();
        let mut jump = Instruction::new("Jump");
        jump.set_parameter(0, Expression::new("300"));
        actions[0].push(jump);
    }
    event.sub_events_mut().unwrap().push(Event::comment("note"));
    event
}

#[test]
fn deep_clone_of_events_list_is_independent() {
    let mut source = EventsList::new();
    source.push(sample_event());

    let mut copy = source.clone();
    assert_eq!(copy, source);

    {
        let event = copy.get_mut(0).unwrap();
        let mut conditions = event.condition_lists_mut();
        conditions[0].get_mut(0).unwrap().set_inverted(true);
        event.sub_events_mut().unwrap().push(Event::comment("only in the copy"));
    }

    let original = source.get(0).unwrap();
    assert!(!original.condition_lists()[0].get(0).unwrap().is_inverted());
    assert_eq!(original.sub_events().unwrap().len(), 1);
    assert_ne!(copy, source);

    // destroying the copy leaves the source untouched
    drop(copy);
    assert_eq!(source.len(), 1);
}

#[test]
fn clone_records_provenance_of_each_event() {
    let mut source = EventsList::new();
    source.push(sample_event());
    source.push(Event::comment("second"));

    let copy = source.clone();
    for (original, cloned) in source.iter().zip(copy.iter()) {
        assert_eq!(cloned.origin(), Some(original.id()));
        assert_ne!(cloned.id(), original.id());
    }

    // another generation still points at the first ancestors
    let grandchild = copy.clone();
    for (original, cloned) in source.iter().zip(grandchild.iter()) {
        assert_eq!(cloned.origin(), Some(original.id()));
    }
}

#[test]
fn nested_mutation_marks_the_whole_chain_dirty() {
    let mut list = EventsList::new();
    list.push(sample_event());
    list.mark_clean();
    assert!(!list.is_dirty());
    assert!(!list.get(0).unwrap().is_dirty());

    {
        let event = list.get_mut(0).unwrap();
        let mut actions = event.action_lists_mut();
        actions[0]
            .get_mut(0)
            .unwrap()
            .set_parameter(0, Expression::new("450"));
    }

    assert!(list.is_dirty());
    assert!(list.get(0).unwrap().is_dirty());
    assert!(list.get(0).unwrap().action_lists()[0].is_dirty());
    // untouched siblings stay clean
    assert!(!list.get(0).unwrap().condition_lists()[0].is_dirty());
}

#[test]
fn remove_event_by_identity() {
    let mut list = EventsList::new();
    list.push(Event::comment("same"));
    list.push(Event::comment("same"));
    let first = list.get(0).unwrap().id();
    let second = list.get(1).unwrap().id();

    let removed = list.remove_event(first).unwrap();
    assert_eq!(removed.id(), first);
    assert_eq!(list.len(), 1);
    // the value-equal twin is untouched
    assert_eq!(list.get(0).unwrap().id(), second);
    assert!(list.remove_event(first).is_none());
}

#[test]
fn moved_events_keep_their_sub_tree() {
    let mut source = EventsList::new();
    source.push(sample_event());
    let id = source.get(0).unwrap().id();

    let mut target = EventsList::new();
    target.push(Event::comment("existing"));
    assert!(source.move_event_to(id, &mut target, 0));

    let moved = target.get(0).unwrap();
    assert_eq!(moved.id(), id);
    assert_eq!(moved.sub_events().unwrap().len(), 1);
    assert_eq!(moved.condition_lists()[0].len(), 1);

    // the move rewires invalidation into the new list
    target.mark_clean();
    target
        .get_mut(0)
        .unwrap()
        .sub_events_mut()
        .unwrap()
        .push(Event::comment("new"));
    assert!(target.is_dirty());
}
