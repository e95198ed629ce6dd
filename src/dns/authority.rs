//! Contains the record table for the local zone
//!
//! The server is authoritative for a single zone, identified by its apex
//! name. Records are kept in the order they were loaded; the table is built
//! once at startup and only read afterwards, so it is shared between worker
//! threads without any locking.
//!
//! ## Query Resolution
//!
//! 1. A record matches when its type and class are identical to the
//!    question's and its name has the same labels, ignoring ASCII case.
//! 2. The first matching record in table order is the answer; at most one
//!    record is returned.
//! 3. A name is inside the zone when its trailing labels are the apex's
//!    labels, ignoring ASCII case.

use crate::dns::buffer::parse_name;
use crate::dns::protocol::{DnsQuestion, ResourceRecord};
use crate::dns::query_type::{RecordClass, RecordType};

/// Outcome of resolving one question against the table
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub resources: Vec<ResourceRecord>,
    /// Whether the question's name is inside our zone
    pub authoritative: bool,
}

/// Wire labels of a name, lowercased; `None` for text that is not a valid name
type NameKey = Option<Vec<Vec<u8>>>;

fn name_key(name: &str) -> NameKey {
    parse_name(name).ok().map(|labels| {
        labels
            .into_iter()
            .map(|mut label| {
                label.make_ascii_lowercase();
                label
            })
            .collect()
    })
}

#[derive(Clone, Debug)]
pub struct Authority {
    apex: String,
    apex_key: NameKey,
    records: Vec<ResourceRecord>,
    record_keys: Vec<NameKey>,
}

impl Authority {
    pub fn new(apex: &str, records: Vec<ResourceRecord>) -> Authority {
        let apex_key = name_key(apex);
        if apex_key.is_none() {
            log::warn!("Zone apex {:?} is not a valid name, no name is inside it", apex);
        }

        let record_keys = records.iter().map(|rec| name_key(&rec.domain)).collect();

        Authority {
            apex: apex.strip_suffix('.').unwrap_or(apex).to_lowercase(),
            apex_key,
            records,
            record_keys,
        }
    }

    pub fn apex(&self) -> &str {
        &self.apex
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// First record with the given type and class whose name matches `name`
    pub fn lookup(
        &self,
        rtype: RecordType,
        class: RecordClass,
        name: &str,
    ) -> Option<&ResourceRecord> {
        let qname = name_key(name)?;

        self.records
            .iter()
            .zip(&self.record_keys)
            .find(|(rec, key)| {
                rec.rtype == rtype && rec.class == class && key.as_ref() == Some(&qname)
            })
            .map(|(rec, _)| rec)
    }

    pub fn is_authoritative(&self, name: &str) -> bool {
        match (&self.apex_key, name_key(name)) {
            (Some(apex), Some(qname)) => qname.ends_with(apex),
            _ => false,
        }
    }

    /// Look up the answer for a single question
    ///
    /// Authority and additional sections are always empty; there is no
    /// delegation or glue logic. Deciding the response code from the result is
    /// left to the caller.
    pub fn resolve(&self, question: &DnsQuestion) -> Resolution {
        let authoritative = self.is_authoritative(&question.name);

        let answers = self
            .lookup(question.qtype, question.qclass, &question.name)
            .cloned()
            .into_iter()
            .collect::<Vec<_>>();

        log::debug!(
            "resolved {} with {} answer(s), authoritative: {}",
            question,
            answers.len(),
            authoritative
        );

        Resolution {
            answers,
            authorities: Vec::new(),
            resources: Vec::new(),
            authoritative,
        }
    }
}
