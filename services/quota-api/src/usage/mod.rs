//! Aggregation over quota rows: per-member usage maps and per-PI summaries.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::storage::QuotaRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUsage {
    pub usage: u64,
    pub soft: u64,
    pub hard: u64,
    pub files: u64,
}

impl From<&QuotaRecord> for MemberUsage {
    fn from(record: &QuotaRecord) -> Self {
        Self {
            usage: record.usage,
            soft: record.soft_limit,
            hard: record.hard_limit,
            files: record.files,
        }
    }
}

/// Member usage keyed by name, serialized as a JSON object in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberMap {
    entries: Vec<(String, MemberUsage)>,
}

impl MemberMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the usage of an existing member in place.
    pub fn insert(&mut self, name: String, usage: MemberUsage) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = usage,
            None => self.entries.push((name, usage)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MemberUsage> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, usage)| usage)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MemberUsage)> + '_ {
        self.entries.iter().map(|(name, usage)| (name, usage))
    }
}

impl Serialize for MemberMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for MemberMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MemberMapVisitor;

        impl<'de> Visitor<'de> for MemberMapVisitor {
            type Value = MemberMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of member name to usage")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MemberMap, A::Error> {
                let mut members = MemberMap::new();
                while let Some((name, usage)) = access.next_entry::<String, MemberUsage>()? {
                    members.insert(name, usage);
                }
                Ok(members)
            }
        }

        deserializer.deserialize_map(MemberMapVisitor)
    }
}

/// A later row for the same member replaces an earlier one.
pub fn group_members(records: &[QuotaRecord]) -> MemberMap {
    let mut members = MemberMap::new();
    for record in records {
        members.insert(record.student_name.clone(), MemberUsage::from(record));
    }
    members
}

pub fn group_by_pi(records: &[QuotaRecord]) -> BTreeMap<String, MemberMap> {
    let mut grouped: BTreeMap<String, MemberMap> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.pi_name.clone())
            .or_default()
            .insert(record.student_name.clone(), MemberUsage::from(record));
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(rename = "PI")]
    pub pi: String,
    #[serde(rename = "Number of Users")]
    pub number_of_users: u64,
    #[serde(rename = "Total Usage")]
    pub total_usage: u64,
    #[serde(rename = "Usage Average")]
    pub usage_average: f64,
    #[serde(rename = "Max Individual Usage")]
    pub max_individual_usage: u64,
}

impl UsageSummary {
    pub fn from_records(pi: &str, records: &[QuotaRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let total_usage = records
            .iter()
            .fold(0u64, |acc, record| acc.saturating_add(record.usage));
        let max_individual_usage = records.iter().map(|record| record.usage).max()?;
        let number_of_users = records.len() as u64;

        Some(Self {
            pi: pi.to_string(),
            number_of_users,
            total_usage,
            usage_average: total_usage as f64 / number_of_users as f64,
            max_individual_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, pi: &str, member: &str, usage: u64) -> QuotaRecord {
        QuotaRecord {
            quota_id: id,
            pi_name: pi.to_string(),
            student_name: member.to_string(),
            usage,
            soft_limit: 20,
            hard_limit: 25,
            files: 13,
        }
    }

    #[test]
    fn summary_matches_seeded_lab() {
        let records = vec![
            record(1, "amy", "tom", 1),
            record(2, "amy", "amy", 3),
            record(3, "amy", "mary", 12),
        ];

        let summary = UsageSummary::from_records("amy", &records).unwrap();
        assert_eq!(summary.number_of_users, 3);
        assert_eq!(summary.total_usage, 16);
        assert!((summary.usage_average - 16.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(summary.max_individual_usage, 12);
    }

    #[test]
    fn summary_of_nothing_is_none() {
        assert!(UsageSummary::from_records("amy", &[]).is_none());
    }

    #[test]
    fn summary_serializes_with_display_keys() {
        let summary = UsageSummary::from_records("bob", &[record(1, "bob", "alice", 5)]).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["PI"], "bob");
        assert_eq!(json["Number of Users"], 1);
        assert_eq!(json["Total Usage"], 5);
        assert_eq!(json["Usage Average"], 5.0);
        assert_eq!(json["Max Individual Usage"], 5);
    }

    #[test]
    fn grouping_by_pi_nests_members() {
        let records = vec![
            record(1, "amy", "tom", 1),
            record(2, "bob", "alice", 5),
            record(3, "amy", "mary", 12),
        ];

        let grouped = group_by_pi(&records);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["amy"].len(), 2);
        assert_eq!(grouped["amy"].get("mary").map(|m| m.usage), Some(12));
        assert_eq!(grouped["bob"].get("alice").map(|m| m.soft), Some(20));
    }

    #[test]
    fn members_keep_row_order() {
        let records = vec![
            record(1, "amy", "tom", 1),
            record(2, "amy", "amy", 3),
            record(3, "amy", "mary", 12),
        ];

        let members = group_members(&records);
        assert_eq!(members.names().collect::<Vec<_>>(), vec!["tom", "amy", "mary"]);

        let json = serde_json::to_string(&members).unwrap();
        let tom = json.find("\"tom\"").unwrap();
        let amy = json.find("\"amy\"").unwrap();
        let mary = json.find("\"mary\"").unwrap();
        assert!(tom < amy && amy < mary, "unexpected order in {json}");

        let parsed: MemberMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, members);
    }

    #[test]
    fn duplicate_member_rows_keep_the_latest() {
        let records = vec![record(1, "amy", "tom", 1), record(2, "amy", "tom", 7)];
        let members = group_members(&records);
        assert_eq!(members.len(), 1);
        assert_eq!(members.get("tom").map(|m| m.usage), Some(7));
    }
}
