use super::*;

fn rejected_field(expr: &str) -> Option<CronField> {
    validate_cron(expr).expect_err(expr).field()
}

// -- acceptance --------------------------------------------------------

#[test]
fn test_accepts_common_expressions() {
    for expr in [
        "* * * * *",
        "*/15 * * * *",
        "0 0 * * 0",
        "0 0 * * 7",
        "0,30 9-17 * * 1-5",
        "30 2 1 jan,Jul *",
        "0 3 * * MON-fri",
        "5/15 * * * *",
        "0 0 1-31/2 * *",
        "0 12 * * sun-sat/2",
        "59 23 31 12 7",
    ] {
        assert!(validate_cron(expr).is_ok(), "{expr} should be accepted");
    }
}

#[test]
fn test_accepted_expression_is_kept_verbatim() {
    let cron = CronExpression::parse("0  3 * *   mon").unwrap();
    assert_eq!(cron.as_str(), "0  3 * *   mon");
    assert_eq!(cron.field(CronField::DayOfWeek).raw(), "mon");
}

// -- rejection ---------------------------------------------------------

#[test]
fn test_minute_out_of_range_names_minute() {
    let err = validate_cron("60 * * * *").unwrap_err();
    assert_eq!(err.field(), Some(CronField::Minute));
    assert!(err.to_string().contains("minute"), "{err}");
    assert!(err.to_string().contains("60"), "{err}");
}

#[test]
fn test_zero_step_is_rejected() {
    let err = validate_cron("*/0 * * * *").unwrap_err();
    assert!(matches!(err, CronError::InvalidStep { field: CronField::Minute, .. }));
}

#[test]
fn test_step_larger_than_field_span_is_rejected() {
    assert!(validate_cron("*/60 * * * *").is_ok());
    assert_eq!(rejected_field("*/61 * * * *"), Some(CronField::Minute));
    assert_eq!(rejected_field("0 */25 * * *"), Some(CronField::Hour));
    assert_eq!(rejected_field("0 0 * */13 *"), Some(CronField::Month));
}

#[test]
fn test_day_of_week_range_out_of_bounds() {
    let err = validate_cron("0 0 1 1 8-9").unwrap_err();
    assert_eq!(
        err,
        CronError::OutOfRange {
            field: CronField::DayOfWeek,
            value: 8,
            min: 0,
            max: 7
        }
    );
    assert!(err.to_string().contains("day-of-week"));
}

#[test]
fn test_wrong_field_count() {
    assert_eq!(validate_cron("* * * *"), Err(CronError::FieldCount(4)));
    assert_eq!(validate_cron("0 * * * * *"), Err(CronError::FieldCount(6)));
    assert_eq!(validate_cron(""), Err(CronError::FieldCount(0)));
}

#[test]
fn test_line_breaks_are_not_field_separators() {
    assert_eq!(validate_cron("0\n3 * * *"), Err(CronError::ControlCharacter('\n')));
    assert_eq!(validate_cron("0 3 * * *\r"), Err(CronError::ControlCharacter('\r')));
    assert_eq!(validate_cron("0 3 * * *\n"), Err(CronError::ControlCharacter('\n')));
    assert!(validate_cron("0 3 * * *\u{0}").is_err());
    assert_eq!(validate_cron("0 3 *\u{b}* *").unwrap_err().field(), None);
}

#[test]
fn test_tabs_separate_fields() {
    let cron = CronExpression::parse("0\t3 * *\t\tmon").unwrap();
    assert_eq!(cron.as_str(), "0\t3 * *\t\tmon");
    assert_eq!(cron.field(CronField::Hour).raw(), "3");
}

#[test]
fn test_inverted_range_is_rejected() {
    assert!(matches!(
        validate_cron("0 17-9 * * *"),
        Err(CronError::InvertedRange { field: CronField::Hour, .. })
    ));
    assert!(matches!(
        validate_cron("0 0 * * FRI-MON"),
        Err(CronError::InvertedRange { field: CronField::DayOfWeek, .. })
    ));
}

#[test]
fn test_aliases_only_apply_to_their_field() {
    assert_eq!(rejected_field("0 0 jan * *"), Some(CronField::DayOfMonth));
    assert_eq!(rejected_field("0 0 * mon *"), Some(CronField::Month));
    assert_eq!(rejected_field("0 0 * * jan"), Some(CronField::DayOfWeek));
}

#[test]
fn test_lower_bounds_enforced() {
    assert_eq!(rejected_field("0 0 0 * *"), Some(CronField::DayOfMonth));
    assert_eq!(rejected_field("0 0 * 0 *"), Some(CronField::Month));
}

#[test]
fn test_malformed_atoms() {
    assert!(matches!(
        validate_cron("1,,2 * * * *"),
        Err(CronError::EmptyAtom { field: CronField::Minute })
    ));
    assert_eq!(rejected_field("a * * * *"), Some(CronField::Minute));
    assert_eq!(rejected_field("-5 * * * *"), Some(CronField::Minute));
    assert_eq!(rejected_field("* 1/x * * *"), Some(CronField::Hour));
    assert_eq!(rejected_field("99999999999 * * * *"), Some(CronField::Minute));
}

#[test]
fn test_first_violation_wins() {
    // Both hour and month are bad; hour comes first.
    assert_eq!(rejected_field("0 24 * 13 *"), Some(CronField::Hour));
    // Within a field, the leftmost atom is reported.
    let err = validate_cron("70,80 * * * *").unwrap_err();
    assert!(matches!(err, CronError::OutOfRange { value: 70, .. }));
}

// -- expansion ---------------------------------------------------------

#[test]
fn test_values_expand_steps_ranges_and_sunday() {
    let cron = CronExpression::parse("5/20 1-7/3 * * 0,7").unwrap();
    assert_eq!(
        cron.field(CronField::Minute).values().into_iter().collect::<Vec<_>>(),
        vec![5, 25, 45]
    );
    assert_eq!(
        cron.field(CronField::Hour).values().into_iter().collect::<Vec<_>>(),
        vec![1, 4, 7]
    );
    assert_eq!(
        cron.field(CronField::DayOfWeek).values().into_iter().collect::<Vec<_>>(),
        vec![0]
    );
}

// -- description -------------------------------------------------------

#[test]
fn test_describe_simple_phrases() {
    assert_eq!(describe("* * * * *").unwrap(), "Every minute");
    assert_eq!(describe("*/15 * * * *").unwrap(), "Every 15 minutes");
    assert_eq!(describe("5 * * * *").unwrap(), "At minute 5 past every hour");
    assert_eq!(describe("0 */6 * * *").unwrap(), "Every 6 hours at minute 0");
}

#[test]
fn test_describe_concrete_times_and_days() {
    assert_eq!(describe("30 2 * * 1-5").unwrap(), "At 02:30 on weekdays");
    assert_eq!(describe("0 9,18 * * sat,sun").unwrap(), "At 09:00, 18:00 on weekends");
    assert_eq!(
        describe("0 0 1,15 * *").unwrap(),
        "At 00:00 on days 1, 15 of the month"
    );
    assert_eq!(describe("15 4 * jan,jul mon").unwrap(), "At 04:15 on Mon in Jan, Jul");
}

#[test]
fn test_describe_falls_back_to_raw_fields() {
    assert_eq!(
        describe("*/5 9-17 * * *").unwrap(),
        "At minute */5 past hour 9-17"
    );
    assert_eq!(
        describe("0 0 1-20 * *").unwrap(),
        "At 00:00 on day-of-month 1-20"
    );
}

#[test]
fn test_describe_invalid_is_none() {
    assert!(describe("61 * * * *").is_none());
}
