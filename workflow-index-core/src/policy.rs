//! Failure policy: what happens when a given step of the pipeline fails.
//!
//! Call sites that are able to degrade ask [`recovery_for`] instead of
//! deciding locally. Passthrough sites such as repository info are listed
//! too, so the table reads as the full degrade-or-propagate behaviour.

use serde::Serialize;

/// Where in the pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureSite {
    /// Listing one subdirectory during a directory walk.
    SubdirectoryListing,
    /// Aggregate document decoded to no recognised layout.
    AggregateShape,
    /// Fetching one item's content during batch enrichment.
    ItemEnrichment,
    /// Fetching one item's content on a single-workflow lookup.
    LazyContentFetch,
    /// The exploration behind a listing refresh.
    TopLevelExploration,
    /// The refresh that runs ahead of a single-workflow lookup.
    WorkflowLookup,
    RepositoryInfo,
    StructureReport,
}

/// What the pipeline does instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recovery {
    /// Leave the failing part out and carry on with the rest.
    Skip,
    /// Treat as an empty result.
    EmptyList,
    /// Keep the item with an explanatory description.
    Placeholder,
    /// Serve the previous snapshot if there is one, otherwise an empty list.
    ServeStaleOrEmpty,
    /// Serve the previous snapshot if there is one, otherwise return the error.
    ServeStaleOrPropagate,
    /// Return the error to the caller.
    Propagate,
}

pub const POLICY: &[(FailureSite, Recovery)] = &[
    (FailureSite::SubdirectoryListing, Recovery::Skip),
    (FailureSite::AggregateShape, Recovery::EmptyList),
    (FailureSite::ItemEnrichment, Recovery::Placeholder),
    (FailureSite::LazyContentFetch, Recovery::Placeholder),
    (FailureSite::TopLevelExploration, Recovery::ServeStaleOrEmpty),
    (FailureSite::WorkflowLookup, Recovery::ServeStaleOrPropagate),
    (FailureSite::RepositoryInfo, Recovery::Propagate),
    (FailureSite::StructureReport, Recovery::Propagate),
];

pub fn recovery_for(site: FailureSite) -> Recovery {
    POLICY
        .iter()
        .find(|(s, _)| *s == site)
        .map(|(_, r)| *r)
        .unwrap_or(Recovery::Propagate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_site_has_exactly_one_entry() {
        let sites = [
            FailureSite::SubdirectoryListing,
            FailureSite::AggregateShape,
            FailureSite::ItemEnrichment,
            FailureSite::LazyContentFetch,
            FailureSite::TopLevelExploration,
            FailureSite::WorkflowLookup,
            FailureSite::RepositoryInfo,
            FailureSite::StructureReport,
        ];
        for site in sites {
            assert_eq!(POLICY.iter().filter(|(s, _)| *s == site).count(), 1, "{site:?}");
        }
    }

    #[test]
    fn listing_never_propagates_but_passthrough_does() {
        assert_ne!(recovery_for(FailureSite::TopLevelExploration), Recovery::Propagate);
        assert_eq!(recovery_for(FailureSite::RepositoryInfo), Recovery::Propagate);
        assert_eq!(recovery_for(FailureSite::SubdirectoryListing), Recovery::Skip);
    }

    #[test]
    fn lookup_without_snapshot_reports_the_outage() {
        assert_eq!(
            recovery_for(FailureSite::WorkflowLookup),
            Recovery::ServeStaleOrPropagate
        );
    }
}
