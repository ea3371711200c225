// Nimbus Drive File Collection Pipeline
// (records, view, query, folder context, sort) -> ordered records to display,
// plus recency buckets for the shared-with-me view. Pure: no I/O, the input
// list is only borrowed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::gateway::FileRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Unknown view: {0}")]
    UnknownView(String),
    #[error("Unknown sort column: {0}")]
    UnknownColumn(String),
}

// ---------------------------------------------------------------------------
// ViewSelector
// ---------------------------------------------------------------------------

/// Navigational context deciding which records a top-level listing keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewSelector {
    #[default]
    Home,
    MyDrive,
    SharedDrives,
    SharedWithMe,
    Starred,
    Spam,
    Trash,
}

impl ViewSelector {
    pub const ALL: [ViewSelector; 7] = [
        ViewSelector::Home,
        ViewSelector::MyDrive,
        ViewSelector::SharedDrives,
        ViewSelector::SharedWithMe,
        ViewSelector::Starred,
        ViewSelector::Spam,
        ViewSelector::Trash,
    ];

    /// Route path this view is reflected into
    pub fn route(&self) -> &'static str {
        match self {
            ViewSelector::Home => "/home",
            ViewSelector::MyDrive => "/my-drive",
            ViewSelector::SharedDrives => "/shared-drives",
            ViewSelector::SharedWithMe => "/shared-with-me",
            ViewSelector::Starred => "/starred",
            ViewSelector::Spam => "/spam",
            ViewSelector::Trash => "/trash",
        }
    }

    /// Resolve the view from a route path, ignoring anything after the first segment
    pub fn from_route(route: &str) -> Result<Self, PipelineError> {
        let segment = route
            .trim()
            .trim_start_matches('/')
            .split(['/', '?'])
            .next()
            .unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|v| &v.route()[1..] == segment)
            .ok_or_else(|| PipelineError::UnknownView(route.to_string()))
    }

    /// The trash view is fed from the trash listing rather than the folder listing
    pub fn lists_trash(&self) -> bool {
        matches!(self, ViewSelector::Trash)
    }

    /// Top-level retain rule for this view
    pub fn retains(&self, record: &FileRecord, current_user: &str) -> bool {
        match self {
            ViewSelector::Home => !record.trashed && !record.spam,
            ViewSelector::SharedDrives => !record.trashed && !record.share.recipients.is_empty(),
            ViewSelector::SharedWithMe => {
                !record.trashed && record.owner_id.as_deref() != Some(current_user)
            }
            ViewSelector::Starred => record.favorite && !record.trashed,
            ViewSelector::Trash => true,
            ViewSelector::MyDrive | ViewSelector::Spam => !record.trashed,
        }
    }
}

impl fmt::Display for ViewSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewSelector::Home => write!(f, "Home"),
            ViewSelector::MyDrive => write!(f, "My Drive"),
            ViewSelector::SharedDrives => write!(f, "Shared drives"),
            ViewSelector::SharedWithMe => write!(f, "Shared with me"),
            ViewSelector::Starred => write!(f, "Starred"),
            ViewSelector::Spam => write!(f, "Spam"),
            ViewSelector::Trash => write!(f, "Trash"),
        }
    }
}

impl FromStr for ViewSelector {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_route(s)
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    #[default]
    None,
    Modified,
    Size,
}

impl SortColumn {
    /// Direction applied when this column is picked fresh
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortColumn::Modified => SortDirection::Desc,
            SortColumn::Size | SortColumn::None => SortDirection::Asc,
        }
    }
}

impl FromStr for SortColumn {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(SortColumn::None),
            "modified" | "date" | "time" => Ok(SortColumn::Modified),
            "size" => Ok(SortColumn::Size),
            other => Err(PipelineError::UnknownColumn(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Column header click: same column flips, a new column starts at its default
    pub fn toggle(&mut self, column: SortColumn) {
        if self.column == column {
            self.direction = self.direction.flip();
        } else {
            self.column = column;
            self.direction = column.default_direction();
        }
    }
}

/// Parse a record timestamp. Missing or unparseable values resolve to the
/// Unix epoch so malformed records sort as oldest instead of failing.
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| try_parse_timestamp(s.trim()))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn try_parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    // Epoch numbers: anything this large is milliseconds
    let n = s.parse::<i64>().ok()?;
    if n.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

/// Folders sit at -1 so they order below every file
fn size_key(record: &FileRecord) -> i64 {
    if record.is_folder() {
        -1
    } else {
        record.size.map(|s| s.min(i64::MAX as u64) as i64).unwrap_or(0)
    }
}

/// Stable single-key sort; `SortColumn::None` keeps input order
pub fn sort(items: &mut [&FileRecord], state: SortState) {
    let desc = state.direction == SortDirection::Desc;
    match state.column {
        SortColumn::None => {}
        SortColumn::Modified if desc => {
            items.sort_by_cached_key(|r| Reverse(parse_timestamp(r.modified.as_deref())))
        }
        SortColumn::Modified => items.sort_by_cached_key(|r| parse_timestamp(r.modified.as_deref())),
        SortColumn::Size if desc => items.sort_by_key(|r| Reverse(size_key(r))),
        SortColumn::Size => items.sort_by_key(|r| size_key(r)),
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub view: ViewSelector,
    pub query: &'a str,
    /// Folder being browsed; None at the top level of a view
    pub parent: Option<&'a str>,
    pub current_user: &'a str,
}

/// Case-insensitive substring match on the name; an empty query matches everything
pub fn matches_query(record: &FileRecord, query: &str) -> bool {
    query.is_empty() || record.name.to_lowercase().contains(&query.to_lowercase())
}

pub fn retains(ctx: &FilterContext<'_>, record: &FileRecord) -> bool {
    if !matches_query(record, ctx.query) {
        return false;
    }
    match ctx.parent {
        // Inside a folder the view predicate does not apply
        Some(_) => !record.trashed,
        None => ctx.view.retains(record, ctx.current_user),
    }
}

pub fn filter<'a>(records: &'a [FileRecord], ctx: &FilterContext<'_>) -> Vec<&'a FileRecord> {
    records.iter().filter(|r| retains(ctx, r)).collect()
}

/// Filter then sort
pub fn run<'a>(
    records: &'a [FileRecord],
    ctx: &FilterContext<'_>,
    state: SortState,
) -> Vec<&'a FileRecord> {
    let mut items = filter(records, ctx);
    sort(&mut items, state);
    items
}

// ---------------------------------------------------------------------------
// Recency grouping (shared-with-me)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecencyBucket {
    Yesterday,
    LastMonth,
    Older,
}

impl RecencyBucket {
    pub const ALL: [RecencyBucket; 3] = [
        RecencyBucket::Yesterday,
        RecencyBucket::LastMonth,
        RecencyBucket::Older,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecencyBucket::Yesterday => "Yesterday",
            RecencyBucket::LastMonth => "Last month",
            RecencyBucket::Older => "Older",
        }
    }

    /// Bucket for an age in calendar days (negative ages are future dates)
    pub fn for_age_days(days: i64) -> Self {
        if days <= 1 {
            RecencyBucket::Yesterday
        } else if days <= 30 {
            RecencyBucket::LastMonth
        } else {
            RecencyBucket::Older
        }
    }
}

/// Calendar-day difference between `now` and the record's modification date (UTC)
pub fn age_in_days(record: &FileRecord, now: DateTime<Utc>) -> i64 {
    let modified = parse_timestamp(record.modified.as_deref());
    (now.date_naive() - modified.date_naive()).num_days()
}

/// Per-bucket date direction, each toggled independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSort {
    pub yesterday: SortDirection,
    pub last_month: SortDirection,
    pub older: SortDirection,
}

impl Default for GroupSort {
    fn default() -> Self {
        Self {
            yesterday: SortDirection::Desc,
            last_month: SortDirection::Desc,
            older: SortDirection::Desc,
        }
    }
}

impl GroupSort {
    pub fn direction(&self, bucket: RecencyBucket) -> SortDirection {
        match bucket {
            RecencyBucket::Yesterday => self.yesterday,
            RecencyBucket::LastMonth => self.last_month,
            RecencyBucket::Older => self.older,
        }
    }

    pub fn toggle(&mut self, bucket: RecencyBucket) {
        let slot = match bucket {
            RecencyBucket::Yesterday => &mut self.yesterday,
            RecencyBucket::LastMonth => &mut self.last_month,
            RecencyBucket::Older => &mut self.older,
        };
        *slot = slot.flip();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecencyGroups<'a> {
    pub yesterday: Vec<&'a FileRecord>,
    pub last_month: Vec<&'a FileRecord>,
    pub older: Vec<&'a FileRecord>,
}

impl<'a> RecencyGroups<'a> {
    pub fn bucket(&self, bucket: RecencyBucket) -> &[&'a FileRecord] {
        match bucket {
            RecencyBucket::Yesterday => &self.yesterday,
            RecencyBucket::LastMonth => &self.last_month,
            RecencyBucket::Older => &self.older,
        }
    }

    fn bucket_mut(&mut self, bucket: RecencyBucket) -> &mut Vec<&'a FileRecord> {
        match bucket {
            RecencyBucket::Yesterday => &mut self.yesterday,
            RecencyBucket::LastMonth => &mut self.last_month,
            RecencyBucket::Older => &mut self.older,
        }
    }

    /// Buckets in display order
    pub fn iter(&self) -> impl Iterator<Item = (RecencyBucket, &[&'a FileRecord])> + '_ {
        RecencyBucket::ALL.into_iter().map(move |b| (b, self.bucket(b)))
    }

    pub fn len(&self) -> usize {
        self.yesterday.len() + self.last_month.len() + self.older.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Order every bucket by date in its own direction
    pub fn sorted(mut self, group_sort: GroupSort) -> Self {
        for bucket in RecencyBucket::ALL {
            let state = SortState::new(SortColumn::Modified, group_sort.direction(bucket));
            sort(self.bucket_mut(bucket), state);
        }
        self
    }
}

/// Partition into the three recency buckets, keeping input order within each
pub fn group_by_recency<'a>(items: &[&'a FileRecord], now: DateTime<Utc>) -> RecencyGroups<'a> {
    let mut groups = RecencyGroups::default();
    for &record in items {
        let bucket = RecencyBucket::for_age_days(age_in_days(record, now));
        groups.bucket_mut(bucket).push(record);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> Option<String> {
        Some((now() - Duration::days(days)).to_rfc3339())
    }

    fn ctx(view: ViewSelector) -> FilterContext<'static> {
        FilterContext {
            view,
            query: "",
            parent: None,
            current_user: "me",
        }
    }

    fn names(items: &[&FileRecord]) -> Vec<String> {
        items.iter().map(|r| r.name.clone()).collect()
    }

    fn scenario_records() -> Vec<FileRecord> {
        let mut report = FileRecord::file("1", "Report.pdf", 100);
        report.modified = days_ago(2);
        let mut old = FileRecord::file("2", "Old.zip", 100);
        old.trashed = true;
        vec![report, old]
    }

    fn mixed_records() -> Vec<FileRecord> {
        let mut records = Vec::new();
        for (i, name) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            let mut r = FileRecord::file(i.to_string(), *name, (i as u64 + 1) * 10);
            r.trashed = i % 3 == 0;
            r.spam = i == 1;
            r.favorite = i % 2 == 0;
            r.owner_id = Some(if i < 3 { "me".into() } else { "other".into() });
            if i == 4 {
                r.share.recipients.push("u9".into());
            }
            records.push(r);
        }
        records
    }

    #[test]
    fn test_home_excludes_trashed() {
        let records = scenario_records();
        assert_eq!(names(&run(&records, &ctx(ViewSelector::Home), SortState::default())), vec!["Report.pdf"]);
    }

    #[test]
    fn test_query_filters_case_insensitively() {
        let records = scenario_records();
        let mut c = ctx(ViewSelector::Home);
        c.query = "rep";
        assert_eq!(names(&filter(&records, &c)), vec!["Report.pdf"]);
        c.query = "REPORT";
        assert_eq!(names(&filter(&records, &c)), vec!["Report.pdf"]);
        c.query = "zzz";
        assert!(filter(&records, &c).is_empty());
    }

    #[test]
    fn test_starred_view() {
        let mut a = FileRecord::file("1", "A", 1);
        a.favorite = true;
        let b = FileRecord::file("2", "B", 1);
        let records = vec![a, b];
        assert_eq!(names(&filter(&records, &ctx(ViewSelector::Starred))), vec!["A"]);
    }

    #[test]
    fn test_view_predicate_table() {
        let records = mixed_records();
        let check = |view, expected: &[&str]| {
            assert_eq!(names(&filter(&records, &ctx(view))), expected, "{:?}", view);
        };
        check(ViewSelector::Home, &["c", "e", "f"]);
        check(ViewSelector::MyDrive, &["b", "c", "e", "f"]);
        check(ViewSelector::Spam, &["b", "c", "e", "f"]);
        check(ViewSelector::SharedDrives, &["e"]);
        check(ViewSelector::SharedWithMe, &["e", "f"]);
        check(ViewSelector::Starred, &["c", "e"]);
        check(ViewSelector::Trash, &["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_folder_context_bypasses_view_predicate() {
        let records = mixed_records();
        let mut c = ctx(ViewSelector::Starred);
        c.parent = Some("folder-1");
        assert_eq!(names(&filter(&records, &c)), vec!["b", "c", "e", "f"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = mixed_records();
        for view in ViewSelector::ALL {
            let once: Vec<FileRecord> = filter(&records, &ctx(view)).into_iter().cloned().collect();
            let twice: Vec<FileRecord> = filter(&once, &ctx(view)).into_iter().cloned().collect();
            assert_eq!(once, twice, "{:?}", view);
        }
    }

    #[test]
    fn test_size_sort_places_folders_first_ascending() {
        let records = vec![
            FileRecord::file("1", "big", 500),
            FileRecord::folder("2", "dir"),
            FileRecord::file("3", "small", 10),
        ];
        let asc = run(&records, &ctx(ViewSelector::MyDrive), SortState::new(SortColumn::Size, SortDirection::Asc));
        assert_eq!(names(&asc), vec!["dir", "small", "big"]);

        let desc = run(&records, &ctx(ViewSelector::MyDrive), SortState::new(SortColumn::Size, SortDirection::Desc));
        assert_eq!(names(&desc), vec!["big", "small", "dir"]);
    }

    #[test]
    fn test_size_sort_keeps_folder_input_order() {
        let records = vec![
            FileRecord::folder("1", "x"),
            FileRecord::file("2", "f", 5),
            FileRecord::folder("3", "y"),
        ];
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let out = run(&records, &ctx(ViewSelector::MyDrive), SortState::new(SortColumn::Size, direction));
            let folders: Vec<_> = out.iter().filter(|r| r.is_folder()).map(|r| r.name.as_str()).collect();
            assert_eq!(folders, vec!["x", "y"]);
        }
    }

    #[test]
    fn test_modified_sort_and_malformed_dates() {
        let mut newest = FileRecord::file("1", "newest", 1);
        newest.modified = days_ago(1);
        let mut broken = FileRecord::file("2", "broken", 1);
        broken.modified = Some("not a date".into());
        let mut middle = FileRecord::file("3", "middle", 1);
        middle.modified = Some("2026-01-02 03:04:05".into());
        let missing = FileRecord::file("4", "missing", 1);
        let records = vec![broken, newest, missing, middle];

        let desc = run(&records, &ctx(ViewSelector::MyDrive), SortState::new(SortColumn::Modified, SortDirection::Desc));
        assert_eq!(names(&desc), vec!["newest", "middle", "broken", "missing"]);

        let asc = run(&records, &ctx(ViewSelector::MyDrive), SortState::new(SortColumn::Modified, SortDirection::Asc));
        assert_eq!(names(&asc), vec!["broken", "missing", "middle", "newest"]);
    }

    #[test]
    fn test_none_column_preserves_input_order() {
        let records = mixed_records();
        let out = run(&records, &ctx(ViewSelector::Trash), SortState::default());
        assert_eq!(names(&out), vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_toggle_rules() {
        let mut state = SortState::default();
        state.toggle(SortColumn::Modified);
        assert_eq!(state, SortState::new(SortColumn::Modified, SortDirection::Desc));
        state.toggle(SortColumn::Modified);
        assert_eq!(state.direction, SortDirection::Asc);
        state.toggle(SortColumn::Size);
        assert_eq!(state, SortState::new(SortColumn::Size, SortDirection::Asc));
        state.toggle(SortColumn::Size);
        assert_eq!(state.direction, SortDirection::Desc);
    }

    #[test]
    fn test_double_toggle_restores_order() {
        let records: Vec<FileRecord> = [30u64, 10, 20]
            .iter()
            .enumerate()
            .map(|(i, s)| FileRecord::file(i.to_string(), format!("f{}", s), *s))
            .collect();
        let start = SortState::new(SortColumn::Size, SortDirection::Asc);
        let before = names(&run(&records, &ctx(ViewSelector::MyDrive), start));

        let mut state = start;
        state.toggle(SortColumn::Size);
        let flipped = names(&run(&records, &ctx(ViewSelector::MyDrive), state));
        assert_ne!(before, flipped);
        state.toggle(SortColumn::Size);
        assert_eq!(names(&run(&records, &ctx(ViewSelector::MyDrive), state)), before);
    }

    #[test]
    fn test_recency_boundaries() {
        assert_eq!(RecencyBucket::for_age_days(-3), RecencyBucket::Yesterday);
        assert_eq!(RecencyBucket::for_age_days(0), RecencyBucket::Yesterday);
        assert_eq!(RecencyBucket::for_age_days(1), RecencyBucket::Yesterday);
        assert_eq!(RecencyBucket::for_age_days(2), RecencyBucket::LastMonth);
        assert_eq!(RecencyBucket::for_age_days(30), RecencyBucket::LastMonth);
        assert_eq!(RecencyBucket::for_age_days(31), RecencyBucket::Older);
    }

    #[test]
    fn test_grouping_partitions_input() {
        let ages = [0, 1, 2, 30, 31, 400];
        let mut records: Vec<FileRecord> = ages
            .iter()
            .map(|d| {
                let mut r = FileRecord::file(d.to_string(), format!("d{}", d), 1);
                r.modified = days_ago(*d);
                r
            })
            .collect();
        records.push(FileRecord::file("x", "undated", 1));

        let items: Vec<&FileRecord> = records.iter().collect();
        let groups = group_by_recency(&items, now());
        assert_eq!(names(&groups.yesterday), vec!["d0", "d1"]);
        assert_eq!(names(&groups.last_month), vec!["d2", "d30"]);
        assert_eq!(names(&groups.older), vec!["d31", "d400", "undated"]);
        assert_eq!(groups.len(), records.len());

        let mut union: Vec<String> = groups.iter().flat_map(|(_, b)| names(b)).collect();
        union.sort();
        let mut expected = names(&items);
        expected.sort();
        assert_eq!(union, expected);
    }

    #[test]
    fn test_bucket_sort_directions_are_independent() {
        let mut records = Vec::new();
        for d in [2, 10, 5, 40, 35] {
            let mut r = FileRecord::file(d.to_string(), format!("d{}", d), 1);
            r.modified = days_ago(d);
            records.push(r);
        }
        let items: Vec<&FileRecord> = records.iter().collect();

        let mut group_sort = GroupSort::default();
        group_sort.toggle(RecencyBucket::Older);
        let groups = group_by_recency(&items, now()).sorted(group_sort);

        // desc by date = most recent first
        assert_eq!(names(&groups.last_month), vec!["d2", "d5", "d10"]);
        // asc by date = oldest first
        assert_eq!(names(&groups.older), vec!["d40", "d35"]);
    }

    #[test]
    fn test_view_routes() {
        for view in ViewSelector::ALL {
            assert_eq!(ViewSelector::from_route(view.route()).unwrap(), view);
        }
        assert_eq!("shared-with-me".parse::<ViewSelector>().unwrap(), ViewSelector::SharedWithMe);
        assert_eq!(ViewSelector::from_route("/starred/abc").unwrap(), ViewSelector::Starred);
        assert!(ViewSelector::from_route("/settings").is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let epoch = DateTime::UNIX_EPOCH;
        assert_eq!(parse_timestamp(None), epoch);
        assert_eq!(parse_timestamp(Some("garbage")), epoch);
        assert_eq!(
            parse_timestamp(Some("1700000000")),
            Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
        );
        assert_eq!(
            parse_timestamp(Some("1700000000000")),
            parse_timestamp(Some("1700000000"))
        );
        assert_eq!(
            parse_timestamp(Some("2026-01-02")),
            Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()
        );
    }
}
