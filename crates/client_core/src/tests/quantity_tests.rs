use super::*;

#[test]
fn decrement_never_goes_below_one() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    editor.decrement();
    assert_eq!(editor.value(), 1);
    assert!(!editor.can_decrement());
    editor.decrement();
    assert_eq!(editor.value(), 1);
}

#[test]
fn increment_is_capped() {
    let mut editor = QuantityEditor::new(RowId(5), MAX_QUANTITY);
    editor.increment();
    assert_eq!(editor.value(), MAX_QUANTITY);
}

#[test]
fn commit_sends_each_new_value_once() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    assert_eq!(editor.commit(), None);

    editor.increment();
    assert_eq!(
        editor.commit(),
        Some(RowAction::Quantity {
            id: RowId(5),
            quantity: 3,
        })
    );
    assert_eq!(editor.commit(), None);

    editor.increment();
    editor.decrement();
    assert_eq!(editor.commit(), None);
}

#[test]
fn commit_skips_value_equal_to_saved() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    editor.increment();
    editor.decrement();
    assert_eq!(editor.commit(), None);
}

#[test]
fn rollback_reverts_failed_value_on_display() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    editor.increment();
    editor.commit();

    assert!(editor.rollback(3, 2));
    assert_eq!(editor.value(), 2);

    editor.increment();
    assert!(editor.commit().is_some());
}

#[test]
fn rollback_ignores_stale_failures() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    editor.increment();
    editor.commit();
    editor.increment();

    assert!(!editor.rollback(3, 2));
    assert_eq!(editor.value(), 4);
    assert_eq!(editor.saved(), 2);
}

#[test]
fn confirm_moves_saved_quantity() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    editor.increment();
    editor.commit();
    editor.confirm(3);

    assert_eq!(editor.saved(), 3);
    assert_eq!(editor.commit(), None);
    assert!(!editor.rollback(3, 3));
}

#[test]
fn rollback_reverts_to_last_good_value_from_store() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    editor.increment();
    editor.commit();
    editor.increment();
    editor.commit();

    // 3 was accepted upstream before 4 was refused.
    assert!(editor.rollback(4, 3));
    assert_eq!(editor.value(), 3);
    assert_eq!(editor.saved(), 3);
    assert_eq!(editor.commit(), None);
}

#[test]
fn apply_event_tracks_saves_and_rollbacks_for_its_row() {
    let mut editor = QuantityEditor::new(RowId(5), 2);
    editor.increment();
    editor.commit();

    assert!(!editor.apply_event(&RowEvent::QuantitySaved {
        row: RowId(7),
        quantity: 9,
    }));
    assert_eq!(editor.saved(), 2);

    assert!(!editor.apply_event(&RowEvent::QuantitySaved {
        row: RowId(5),
        quantity: 3,
    }));
    assert_eq!(editor.saved(), 3);

    editor.increment();
    editor.commit();
    assert!(editor.apply_event(&RowEvent::QuantityRollback {
        row: RowId(5),
        failed: 4,
        quantity: 3,
    }));
    assert_eq!(editor.value(), 3);
    assert!(!editor.apply_event(&RowEvent::RowsChanged));
}
