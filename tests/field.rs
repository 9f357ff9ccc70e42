//! End-to-end behaviour of the field over both stores.

use chrono::{TimeDelta, TimeZone as _, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use repeating_date::render::XmlRenderer;
use repeating_date::sqlite::SqliteStore;
use repeating_date::{
    EntryId, Error, FieldInput, FieldSettings, Instant, MemoryStore, OccurrenceStore,
    RepeatMode, RepeatingDateField, SortOrder, ValidationError,
};

fn utc(year: i32, month: u32, day: u32) -> Instant {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn weekly_january() -> FieldInput {
    FieldInput::new("2024-01-01", "2024-01-31", 1, RepeatMode::Weeks)
}

async fn sqlite_field() -> RepeatingDateField<SqliteStore> {
    let store = SqliteStore::in_memory().await.unwrap();
    RepeatingDateField::new(FieldSettings::new("Opening Hours"), store)
}

fn memory_field() -> RepeatingDateField<MemoryStore> {
    RepeatingDateField::new(FieldSettings::new("Opening Hours"), MemoryStore::new())
}

async fn process_stores_interior_dates<S: OccurrenceStore>(field: RepeatingDateField<S>) {
    let value = field.process(EntryId(1), weekly_january()).await.unwrap();

    assert_eq!(value.start, utc(2024, 1, 1));
    assert_eq!(value.end, utc(2024, 1, 31));
    assert_eq!(
        field.store().occurrences(value.link_id).await.unwrap(),
        vec![utc(2024, 1, 8), utc(2024, 1, 15), utc(2024, 1, 22), utc(2024, 1, 29)]
    );
    assert_eq!(field.store().value(EntryId(1)).await.unwrap(), Some(value));
}

#[test_log::test(tokio::test)]
async fn process_stores_interior_dates_in_memory() {
    process_stores_interior_dates(memory_field()).await;
}

#[test_log::test(tokio::test)]
async fn process_stores_interior_dates_in_sqlite() {
    process_stores_interior_dates(sqlite_field().await).await;
}

async fn reprocessing_replaces_occurrences<S: OccurrenceStore>(field: RepeatingDateField<S>) {
    let first = field.process(EntryId(5), weekly_january()).await.unwrap();
    let second = field
        .process(
            EntryId(5),
            FieldInput::new("2024-01-31", "2024-04-30", 1, RepeatMode::MonthsByDate),
        )
        .await
        .unwrap();

    assert_eq!(first.link_id, second.link_id);
    assert_eq!(
        field.store().occurrences(second.link_id).await.unwrap(),
        vec![utc(2024, 2, 29), utc(2024, 3, 31), utc(2024, 4, 30)]
    );
}

#[test_log::test(tokio::test)]
async fn reprocessing_replaces_occurrences_in_memory() {
    reprocessing_replaces_occurrences(memory_field()).await;
}

#[test_log::test(tokio::test)]
async fn reprocessing_replaces_occurrences_in_sqlite() {
    reprocessing_replaces_occurrences(sqlite_field().await).await;
}

async fn rejected_input_leaves_storage_alone<S: OccurrenceStore>(field: RepeatingDateField<S>) {
    let stored = field.process(EntryId(2), weekly_january()).await.unwrap();

    let zero_units = FieldInput::new("2024-01-01", "2024-01-31", 0, RepeatMode::Weeks);
    assert!(matches!(
        field.process(EntryId(2), zero_units).await,
        Err(Error::Validation(ValidationError::InvalidUnits { units: 0, .. }))
    ));

    let unknown_mode = FieldInput {
        mode: Some("fortnights".into()),
        ..weekly_january()
    };
    assert!(matches!(
        field.process(EntryId(2), unknown_mode).await,
        Err(Error::UnknownMode(_))
    ));

    assert_eq!(field.store().value(EntryId(2)).await.unwrap(), Some(stored.clone()));
    assert_eq!(field.store().occurrences(stored.link_id).await.unwrap().len(), 4);
    assert_eq!(field.store().value(EntryId(3)).await.unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn rejected_input_leaves_storage_alone_in_memory() {
    rejected_input_leaves_storage_alone(memory_field()).await;
}

#[test_log::test(tokio::test)]
async fn rejected_input_leaves_storage_alone_in_sqlite() {
    rejected_input_leaves_storage_alone(sqlite_field().await).await;
}

async fn ceiling_leaves_storage_alone<S: OccurrenceStore>(store: S) {
    let mut settings = FieldSettings::new("Opening Hours");
    settings.max_occurrences = 3;
    let field = RepeatingDateField::new(settings, store);

    let short = FieldInput::new("2024-01-01", "2024-01-25", 1, RepeatMode::Weeks);
    let stored = field.process(EntryId(2), short).await.unwrap();

    assert!(matches!(
        field.process(EntryId(2), weekly_january()).await,
        Err(Error::TooLarge { limit: 3 })
    ));
    assert!(matches!(
        field.process(EntryId(3), weekly_january()).await,
        Err(Error::TooLarge { limit: 3 })
    ));

    assert_eq!(field.store().value(EntryId(2)).await.unwrap(), Some(stored.clone()));
    assert_eq!(field.store().occurrences(stored.link_id).await.unwrap().len(), 3);
    assert_eq!(field.store().value(EntryId(3)).await.unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn ceiling_leaves_storage_alone_in_memory() {
    ceiling_leaves_storage_alone(MemoryStore::new()).await;
}

#[test_log::test(tokio::test)]
async fn ceiling_leaves_storage_alone_in_sqlite() {
    ceiling_leaves_storage_alone(SqliteStore::in_memory().await.unwrap()).await;
}

async fn fractional_seconds_round_trip<S: OccurrenceStore>(field: RepeatingDateField<S>) {
    let input = FieldInput::new(
        "2024-01-01T00:00:00.5Z",
        "2024-01-31T00:00:00.250Z",
        1,
        RepeatMode::Weeks,
    );
    let value = field.process(EntryId(1), input).await.unwrap();

    assert_eq!(value.start, utc(2024, 1, 1));
    assert_eq!(value.end, utc(2024, 1, 31));
    assert_eq!(field.store().value(EntryId(1)).await.unwrap(), Some(value));
}

#[test_log::test(tokio::test)]
async fn fractional_seconds_round_trip_in_memory() {
    fractional_seconds_round_trip(memory_field()).await;
}

#[test_log::test(tokio::test)]
async fn fractional_seconds_round_trip_in_sqlite() {
    fractional_seconds_round_trip(sqlite_field().await).await;
}

async fn next_occurrence_not_before_sub_second_reference<S: OccurrenceStore>(
    field: RepeatingDateField<S>,
) {
    let value = field.process(EntryId(1), weekly_january()).await.unwrap();
    let store = field.store();

    let exact = store.next_occurrences(utc(2024, 1, 8)).await.unwrap();
    assert_eq!(exact.get(&value.link_id), Some(&utc(2024, 1, 8)));

    let later = utc(2024, 1, 8) + TimeDelta::milliseconds(500);
    let next = store.next_occurrences(later).await.unwrap();
    assert_eq!(next.get(&value.link_id), Some(&utc(2024, 1, 15)));

    let past_last = utc(2024, 1, 29) + TimeDelta::milliseconds(1);
    assert!(store.next_occurrences(past_last).await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn next_occurrence_not_before_sub_second_reference_in_memory() {
    next_occurrence_not_before_sub_second_reference(memory_field()).await;
}

#[test_log::test(tokio::test)]
async fn next_occurrence_not_before_sub_second_reference_in_sqlite() {
    next_occurrence_not_before_sub_second_reference(sqlite_field().await).await;
}

#[test_log::test(tokio::test)]
async fn validation_message_uses_label() {
    let field = memory_field();
    let input = FieldInput {
        start: Some("whenever".into()),
        ..weekly_january()
    };

    assert_eq!(
        field.check(&input).unwrap_err().to_string(),
        "The start date specified in 'Opening Hours' is invalid."
    );
}

#[test_log::test(tokio::test)]
async fn renders_tagged_dates() {
    let field = sqlite_field().await;
    field.process(EntryId(1), weekly_january()).await.unwrap();

    let mut xml = XmlRenderer::new();
    assert!(field
        .render(EntryId(1), utc(2024, 1, 20), &mut xml)
        .await
        .unwrap());
    let xml = xml.into_string().unwrap();

    assert!(xml.starts_with(r#"<opening-hours date-mode="weeks" date-units="1">"#));
    let mut rest = xml.as_str();
    for tag in ["<start ", "<before ", "<before ", "<current ", "<after ", "<end "] {
        let at = rest.find(tag).unwrap_or_else(|| panic!("{tag} missing in {xml}"));
        rest = &rest[at + tag.len()..];
    }
    assert!(xml.contains(">2024-01-22</current>"));
    assert!(xml.ends_with("</opening-hours>"));

    let mut nothing = XmlRenderer::new();
    assert!(!field
        .render(EntryId(9), utc(2024, 1, 20), &mut nothing)
        .await
        .unwrap());
    assert_eq!(nothing.into_string().unwrap(), "");
}

#[test_log::test(tokio::test)]
async fn table_value_shows_next_date() {
    let field = memory_field();
    field.process(EntryId(1), weekly_january()).await.unwrap();

    assert_eq!(
        field.table_value(EntryId(1), utc(2024, 1, 9)).await.unwrap(),
        Some("2024-01-15".into())
    );
    assert_eq!(field.table_value(EntryId(2), utc(2024, 1, 9)).await.unwrap(), None);
}

async fn filter_and_sort<S: OccurrenceStore>(field: RepeatingDateField<S>) {
    // next occurrences relative to 2024-02-10:
    //   1 -> 2024-03-01, 2 -> 2024-02-12, 3 -> nothing left, 4 -> 2024-02-12
    let inputs = [
        (1, FieldInput::new("2024-01-01", "2024-12-31", 1, RepeatMode::MonthsByDate)),
        (2, FieldInput::new("2024-01-01", "2024-06-30", 1, RepeatMode::Weeks)),
        (3, FieldInput::new("2024-01-01", "2024-01-31", 1, RepeatMode::Days)),
        (4, FieldInput::new("2024-01-29", "2024-03-31", 2, RepeatMode::Weeks)),
    ];
    for (entry, input) in inputs {
        field.process(EntryId(entry), input).await.unwrap();
    }
    let entries = [EntryId(3), EntryId(1), EntryId(4), EntryId(2)];
    let reference = utc(2024, 2, 10);
    let mut rng = StdRng::seed_from_u64(7);

    assert_eq!(
        field.filter(reference).await.unwrap(),
        vec![EntryId(1), EntryId(2), EntryId(4)]
    );

    assert_eq!(
        field
            .sort(&entries, SortOrder::Ascending, reference, &mut rng)
            .await
            .unwrap(),
        vec![EntryId(2), EntryId(4), EntryId(1), EntryId(3)]
    );
    assert_eq!(
        field
            .sort(&entries, SortOrder::Descending, reference, &mut rng)
            .await
            .unwrap(),
        vec![EntryId(1), EntryId(2), EntryId(4), EntryId(3)]
    );

    let mut shuffled = field
        .sort(&entries, SortOrder::Random, reference, &mut rng)
        .await
        .unwrap();
    shuffled.sort();
    assert_eq!(shuffled, vec![EntryId(1), EntryId(2), EntryId(3), EntryId(4)]);
}

#[test_log::test(tokio::test)]
async fn filter_and_sort_in_memory() {
    filter_and_sort(memory_field()).await;
}

#[test_log::test(tokio::test)]
async fn filter_and_sort_in_sqlite() {
    filter_and_sort(sqlite_field().await).await;
}

#[test_log::test(tokio::test)]
async fn regenerate_and_delete() {
    let field = sqlite_field().await;
    let value = field.process(EntryId(1), weekly_january()).await.unwrap();

    field
        .store()
        .replace_occurrences(value.link_id, &[])
        .await
        .unwrap();
    assert_eq!(
        field.regenerate(EntryId(1)).await.unwrap().map(|d| d.len()),
        Some(4)
    );
    assert_eq!(field.store().occurrences(value.link_id).await.unwrap().len(), 4);

    field.delete(EntryId(1)).await.unwrap();
    assert_eq!(field.regenerate(EntryId(1)).await.unwrap(), None);
    assert!(field.store().occurrences(value.link_id).await.unwrap().is_empty());
}
