//! Turning a stored value into output for data sources.

use crate::store::FieldValue;
use crate::{next_occurrence, partition, Error, Instant, RepeatMode, Result};
use chrono::Datelike as _;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt;

/// Where a rendered date sits relative to the reference instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DateTag {
    Start,
    Before,
    Current,
    After,
    End,
}

impl DateTag {
    pub fn as_str(self) -> &'static str {
        match self {
            DateTag::Start => "start",
            DateTag::Before => "before",
            DateTag::Current => "current",
            DateTag::After => "after",
            DateTag::End => "end",
        }
    }
}

impl fmt::Display for DateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderedDate {
    pub tag: DateTag,
    pub value: Instant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedField {
    pub mode: RepeatMode,
    pub units: u32,
    pub dates: Vec<RenderedDate>,
}

/// Receives a rendered field. Implemented by whatever produces the final
/// markup.
pub trait RenderSink {
    fn begin_field(&mut self, name: &str, mode: RepeatMode, units: u32) -> Result<()>;
    fn date(&mut self, tag: DateTag, value: Instant) -> Result<()>;
    fn end_field(&mut self) -> Result<()>;
}

/// Tags `value`'s boundaries and its `occurrences` around `reference`.
///
/// Output order is the start, past occurrences, the current one, later
/// ones, then the end.
pub fn tag(value: &FieldValue, occurrences: &[Instant], reference: Instant) -> RenderedField {
    let split = partition(occurrences, reference);

    let mut dates = Vec::with_capacity(split.len() + 2);
    let mut push = |tag, value| dates.push(RenderedDate { tag, value });

    push(DateTag::Start, value.start);
    for date in split.before {
        push(DateTag::Before, date);
    }
    if let Some(current) = split.current {
        push(DateTag::Current, current);
    }
    for date in split.after {
        push(DateTag::After, date);
    }
    push(DateTag::End, value.end);

    RenderedField {
        mode: value.mode,
        units: value.units,
        dates,
    }
}

impl RenderedField {
    pub fn write_to(&self, name: &str, sink: &mut impl RenderSink) -> Result<()> {
        sink.begin_field(name, self.mode, self.units)?;
        for date in &self.dates {
            sink.date(date.tag, date.value)?;
        }
        sink.end_field()
    }
}

/// Summary shown in entry tables: the next occurrence, or the end once
/// everything has passed.
pub fn table_value(value: &FieldValue, occurrences: &[Instant], reference: Instant) -> String {
    next_occurrence(occurrences.iter().copied(), reference)
        .unwrap_or(value.end)
        .format("%Y-%m-%d")
        .to_string()
}

/// Whether `name` can be used as an XML element name without a namespace.
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn render_err(e: impl fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Writes fields as XML elements, one child element per date:
///
/// ```xml
/// <dates date-mode="weeks" date-units="1">
///   <start iso="2024-01-01T00:00:00+00:00" timestamp="1704067200" time="00:00" weekday="1" offset="+0000">2024-01-01</start>
///   ...
/// </dates>
/// ```
pub struct XmlRenderer {
    writer: Writer<Vec<u8>>,
    open: Vec<String>,
}

impl Default for XmlRenderer {
    fn default() -> Self {
        XmlRenderer {
            writer: Writer::new(Vec::new()),
            open: Vec::new(),
        }
    }
}

impl XmlRenderer {
    pub fn new() -> Self {
        XmlRenderer::default()
    }

    pub fn into_string(self) -> Result<String> {
        if let Some(name) = self.open.last() {
            return Err(Error::Render(format!("element '{name}' was never closed")));
        }
        String::from_utf8(self.writer.into_inner()).map_err(render_err)
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(render_err)
    }
}

impl RenderSink for XmlRenderer {
    fn begin_field(&mut self, name: &str, mode: RepeatMode, units: u32) -> Result<()> {
        if !is_xml_name(name) {
            return Err(Error::Render(format!("'{name}' is not a valid element name")));
        }
        let units = units.to_string();
        let start = BytesStart::new(name)
            .with_attributes([("date-mode", mode.as_str()), ("date-units", units.as_str())]);
        self.write(Event::Start(start))?;
        self.open.push(name.to_owned());
        Ok(())
    }

    fn date(&mut self, tag: DateTag, value: Instant) -> Result<()> {
        let iso = value.to_rfc3339();
        let timestamp = value.timestamp().to_string();
        let time = value.format("%H:%M").to_string();
        let weekday = value.weekday().number_from_monday().to_string();
        let date = value.format("%Y-%m-%d").to_string();

        let start = BytesStart::new(tag.as_str()).with_attributes([
            ("iso", iso.as_str()),
            ("timestamp", timestamp.as_str()),
            ("time", time.as_str()),
            ("weekday", weekday.as_str()),
            ("offset", "+0000"),
        ]);
        self.write(Event::Start(start))?;
        self.write(Event::Text(BytesText::new(&date)))?;
        self.write(Event::End(BytesEnd::new(tag.as_str())))
    }

    fn end_field(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| Error::Render("no field element is open".into()))?;
        self.write(Event::End(BytesEnd::new(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LinkId;
    use crate::test_helpers::*;

    fn weekly_january() -> (FieldValue, Vec<Instant>) {
        let value = FieldValue {
            link_id: LinkId(1),
            start: utc(2024, 1, 1, 0),
            end: utc(2024, 1, 31, 0),
            units: 1,
            mode: RepeatMode::Weeks,
        };
        let dates = vec![
            utc(2024, 1, 8, 0),
            utc(2024, 1, 15, 0),
            utc(2024, 1, 22, 0),
            utc(2024, 1, 29, 0),
        ];
        (value, dates)
    }

    fn tags(field: &RenderedField) -> Vec<DateTag> {
        field.dates.iter().map(|d| d.tag).collect()
    }

    #[test]
    fn tags_around_reference() {
        let (value, dates) = weekly_january();
        let field = tag(&value, &dates, utc(2024, 1, 20, 0));

        assert_eq!(
            tags(&field),
            vec![
                DateTag::Start,
                DateTag::Before,
                DateTag::Before,
                DateTag::Current,
                DateTag::After,
                DateTag::End,
            ]
        );
        assert_eq!(field.dates[3].value, utc(2024, 1, 22, 0));
        assert_eq!(field.mode, RepeatMode::Weeks);
        assert_eq!(field.units, 1);
    }

    #[test]
    fn first_upcoming_is_current() {
        let (value, dates) = weekly_january();
        let field = tag(&value, &dates, utc(2023, 1, 1, 0));

        assert_eq!(
            tags(&field),
            vec![
                DateTag::Start,
                DateTag::Current,
                DateTag::After,
                DateTag::After,
                DateTag::After,
                DateTag::End,
            ]
        );
    }

    #[test]
    fn all_past() {
        let (value, dates) = weekly_january();
        let field = tag(&value, &dates, utc(2025, 1, 1, 0));

        assert!(!tags(&field).contains(&DateTag::Current));
        assert_eq!(field.dates.len(), 6);
    }

    #[test]
    fn no_occurrences() {
        let (value, _) = weekly_january();
        let field = tag(&value, &[], utc(2024, 1, 10, 0));

        assert_eq!(tags(&field), vec![DateTag::Start, DateTag::End]);
    }

    #[test]
    fn table_value_is_next_occurrence() {
        let (value, dates) = weekly_january();

        assert_eq!(table_value(&value, &dates, utc(2024, 1, 16, 0)), "2024-01-22");
        assert_eq!(table_value(&value, &dates, utc(2024, 6, 1, 0)), "2024-01-31");
    }

    #[test]
    fn xml() {
        let (value, dates) = weekly_january();
        let field = tag(&value, &dates[..1], utc(2024, 1, 2, 0));

        let mut xml = XmlRenderer::new();
        field.write_to("opening-hours", &mut xml).unwrap();

        assert_eq!(
            xml.into_string().unwrap(),
            concat!(
                r#"<opening-hours date-mode="weeks" date-units="1">"#,
                r#"<start iso="2024-01-01T00:00:00+00:00" timestamp="1704067200" time="00:00" weekday="1" offset="+0000">2024-01-01</start>"#,
                r#"<current iso="2024-01-08T00:00:00+00:00" timestamp="1704672000" time="00:00" weekday="1" offset="+0000">2024-01-08</current>"#,
                r#"<end iso="2024-01-31T00:00:00+00:00" timestamp="1706659200" time="00:00" weekday="3" offset="+0000">2024-01-31</end>"#,
                r#"</opening-hours>"#,
            )
        );
    }

    #[test]
    fn xml_names() {
        assert!(is_xml_name("opening-hours"));
        assert!(is_xml_name("_dates.v2"));
        assert!(!is_xml_name(""));
        assert!(!is_xml_name("2024-dates"));
        assert!(!is_xml_name("-dates"));
        assert!(!is_xml_name("opening hours"));
        assert!(!is_xml_name("a<b"));
    }

    #[test]
    fn invalid_field_name_rejected() {
        let (value, dates) = weekly_january();
        let field = tag(&value, &dates, utc(2024, 1, 2, 0));

        let mut xml = XmlRenderer::new();
        assert!(matches!(
            field.write_to("2024-dates", &mut xml),
            Err(Error::Render(_))
        ));
        assert_eq!(xml.into_string().unwrap(), "");
    }

    #[test]
    fn unbalanced_xml() {
        let mut xml = XmlRenderer::new();
        assert!(xml.end_field().is_err());

        xml.begin_field("dates", RepeatMode::Days, 2).unwrap();
        assert!(matches!(xml.into_string(), Err(Error::Render(_))));
    }
}
