use crate::error::ValidationError;
use infraguard_types::ResourceChange;
use std::collections::BTreeMap;

/// Immutable, address-sorted view of one run's resource changes.
///
/// Built once per run; the `kind` index lets quantifiers scan only the
/// resources they can match. Sorting by address makes every scan order
/// independent of the order the caller supplied resources in.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    resources: Vec<ResourceChange>,
    by_kind: BTreeMap<String, Vec<usize>>,
}

impl Snapshot {
    pub fn new(resources: Vec<ResourceChange>) -> Result<Self, ValidationError> {
        let mut indexed: Vec<(usize, ResourceChange)> = resources.into_iter().enumerate().collect();
        indexed.sort_by(|(ai, a), (bi, b)| a.address.cmp(&b.address).then(ai.cmp(bi)));

        for pair in indexed.windows(2) {
            let (first, a) = &pair[0];
            let (second, b) = &pair[1];
            if a.address == b.address {
                return Err(ValidationError::DuplicateAddress {
                    address: a.address.clone(),
                    first: *first,
                    second: *second,
                });
            }
        }

        let resources: Vec<ResourceChange> = indexed.into_iter().map(|(_, r)| r).collect();
        let mut by_kind: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, r) in resources.iter().enumerate() {
            by_kind.entry(r.kind.clone()).or_default().push(i);
        }

        Ok(Self { resources, by_kind })
    }

    pub fn resources(&self) -> &[ResourceChange] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&ResourceChange> {
        self.resources
            .binary_search_by(|r| r.address.as_str().cmp(address))
            .ok()
            .map(|i| &self.resources[i])
    }

    pub fn of_kind<'s>(&'s self, kind: &str) -> impl Iterator<Item = &'s ResourceChange> + 's {
        self.by_kind
            .get(kind)
            .into_iter()
            .flatten()
            .map(|&i| &self.resources[i])
    }

    /// Resources of any of `kinds`; every resource when `kinds` is empty.
    pub fn of_kinds(&self, kinds: &[String]) -> Vec<&ResourceChange> {
        if kinds.is_empty() {
            return self.resources.iter().collect();
        }
        let mut out: Vec<&ResourceChange> = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for kind in kinds {
            if !seen.insert(kind.as_str()) {
                continue;
            }
            out.extend(self.of_kind(kind));
        }
        out
    }
}
