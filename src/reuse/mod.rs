/*!
 * Reuse and translation linkage.
 *
 * - `linkage`: translation master and locale from item properties
 * - `qualification`: bottom-up reuse values per element
 * - `scheme`: per-project / repository-root reuse rule overrides
 */

pub mod linkage;
pub mod qualification;
pub mod scheme;

pub use linkage::{link_translation, ReuseLinkage};
pub use qualification::{
    compute_reuse, qualify_document, MarkerExpectation, ReuseOutcome, ReuseQualification,
    REUSE_CONFIRMED, REUSE_DISQUALIFIED,
};
pub use scheme::{scheme_candidates, ReuseRules, ReuseScheme};
