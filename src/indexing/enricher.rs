/*!
 * Per-item enrichment: walk, assign identities, link translations and
 * qualify reuse, producing one field map per element.
 *
 * Every item gets its own `IdentityAssigner`, so items can be enriched on
 * separate threads.
 */

use log::debug;
use sha2::{Digest, Sha256};

use super::fields::{self, FieldMap};
use crate::app_config::ReuseConfig;
use crate::errors::{ItemError, ReadError, StateError};
use crate::identity::{IdentityAssigner, ItemContext};
use crate::repos::{ChangedItem, ContentBuffer, ContentBufferResolver, PropertyMap};
use crate::reuse::qualification::ReuseQualification;
use crate::reuse::{
    link_translation, qualify_document, scheme_candidates, MarkerExpectation, ReuseLinkage,
    ReuseRules, ReuseScheme,
};
use crate::xml::{walk, NodeId, XmlDocument};

/// Inputs of reuse qualification for one document
#[derive(Debug, Clone, Copy)]
pub struct ReuseInputs<'a> {
    pub rules: &'a ReuseRules,
    pub expectation: &'a MarkerExpectation,
    /// Value of the item status property
    pub status: Option<&'a str>,
}

/// Result of enriching one item
#[derive(Debug, Clone)]
pub struct EnrichedItem {
    pub context: ItemContext,
    pub linkage: Option<ReuseLinkage>,
    /// Path of the reuse scheme that applied, `None` when reuse was skipped
    pub scheme_path: Option<String>,
    /// One field map per element, in document order
    pub elements: Vec<FieldMap>,
}

/// Build the field maps of a walked document
pub fn build_fields(
    context: &ItemContext,
    document: &XmlDocument,
    reuse: Option<ReuseInputs<'_>>,
    linkage: Option<&ReuseLinkage>,
) -> Result<Vec<FieldMap>, StateError> {
    let assigner = IdentityAssigner::start(context.clone(), document);
    let qualifications: Option<Vec<ReuseQualification>> = reuse
        .map(|r| qualify_document(document, r.rules, r.expectation, r.status));

    let mut elements = Vec::with_capacity(document.len());
    for node in document.nodes() {
        let mut map = FieldMap::new();

        // attributes first so that reserved fields always win
        for attribute in &node.attributes {
            map.insert(fields::attribute_field(&attribute.name), attribute.value.as_str());
        }
        for (prefix, uri) in &node.namespaces {
            map.insert(fields::namespace_field(prefix), uri.as_str());
        }

        map.insert(fields::ID, assigner.id_of(node)?.to_string());
        map.insert(fields::REPO, context.repository.as_str());
        map.insert(fields::PATH, context.item_path.as_str());
        map.insert(fields::REV, context.revision);
        map.insert(fields::NAME, node.name.as_str());
        map.insert(fields::POS, assigner.location_of(node)?.to_string());
        map.insert(fields::DEPTH, node.depth);
        map.insert(fields::POSITION, node.position);

        let related = |id: NodeId| {
            document
                .node(id)
                .ok_or(StateError::UnknownNode(id))
                .and_then(|n| assigner.id_of(n))
                .map(|identity| identity.to_string())
        };
        map.insert_opt(fields::ID_PARENT, node.parent.map(related).transpose()?);
        map.insert_opt(
            fields::ID_PRECEDING,
            node.preceding_sibling.map(related).transpose()?,
        );

        map.insert(fields::SOURCE, node.source.as_str());
        map.insert(
            fields::SOURCE_SHA256,
            format!("{:x}", Sha256::digest(node.source.as_bytes())),
        );
        map.insert(fields::TEXT, document.text_of(node.id));

        if let Some(qualifications) = &qualifications {
            let q = qualifications[node.id];
            map.insert(fields::REUSE_VALUE, q.reuse_value);
            map.insert(fields::REUSE_READY, q.reuse_ready);
        }

        if let Some(linkage) = linkage {
            map.insert_opt(fields::TRANSLATION_MASTER, linkage.master_path.clone());
            map.insert_opt(fields::TRANSLATION_MASTER_REV, linkage.master_revision);
            map.insert_opt(fields::TRANSLATION_LOCALE, linkage.locale.clone());
            map.insert_opt(fields::TRANSLATION_LOCALE_KEY, linkage.locale_key.clone());
        }

        elements.push(map);
    }

    Ok(elements)
}

/// Enriches changed items of one repository
#[derive(Clone)]
pub struct ItemEnricher {
    resolver: ContentBufferResolver,
    config: ReuseConfig,
}

impl ItemEnricher {
    pub fn new(resolver: ContentBufferResolver, config: ReuseConfig) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &ContentBufferResolver {
        &self.resolver
    }

    /// Read an item at a revision and enrich it
    pub fn enrich_at(&self, revision: u64, item: &ChangedItem) -> Result<EnrichedItem, ItemError> {
        let context = ItemContext::new(self.resolver.repository(), item.path.as_str(), revision);
        let unreadable = |source| ItemError::Unreadable {
            item: context.to_string(),
            source,
        };

        let content = self
            .resolver
            .resolve(revision, &item.path)
            .map_err(unreadable)?
            .ok_or_else(|| {
                unreadable(ReadError::NotFound {
                    path: item.path.clone(),
                    revision,
                })
            })?;
        let properties = self
            .resolver
            .properties(revision, &item.path)
            .map_err(unreadable)?
            .unwrap_or_default();

        self.enrich(&context, item, &content, &properties)
    }

    /// Enrich one item from its content and properties
    pub fn enrich(
        &self,
        context: &ItemContext,
        item: &ChangedItem,
        content: &ContentBuffer,
        properties: &PropertyMap,
    ) -> Result<EnrichedItem, ItemError> {
        let document = walk(content.as_bytes()).map_err(|source| ItemError::Malformed {
            item: context.to_string(),
            source,
        })?;

        let linkage = link_translation(properties, &self.config);
        let scheme = self.find_scheme(context)?;

        let reuse = match &scheme {
            Some(scheme) => {
                let rules = ReuseRules::from(&self.config).with_scheme(scheme);
                let expectation = self.expectation(context, item, &rules)?;
                Some((rules, expectation))
            }
            None => {
                debug!("No reuse scheme applies to {}, skipping reuse fields", context);
                None
            }
        };

        let inputs = reuse.as_ref().map(|(rules, expectation)| ReuseInputs {
            rules,
            expectation,
            status: properties.get(&rules.status_property).map(String::as_str),
        });

        let elements = build_fields(context, &document, inputs, linkage.as_ref()).map_err(
            |source| ItemError::State {
                item: context.to_string(),
                source,
            },
        )?;

        Ok(EnrichedItem {
            context: context.clone(),
            linkage,
            scheme_path: scheme.map(|s| s.path),
            elements,
        })
    }

    fn find_scheme(&self, context: &ItemContext) -> Result<Option<ReuseScheme>, ItemError> {
        let candidates = scheme_candidates(&context.item_path, &self.config.scheme_file_name);
        let buffer = self
            .resolver
            .resolve_first(context.revision, &candidates)
            .map_err(|source| ItemError::Unreadable {
                item: context.to_string(),
                source,
            })?;

        buffer
            .map(|b| ReuseScheme::parse(&b.path, b.as_bytes()))
            .transpose()
            .map_err(|source| ItemError::Scheme {
                item: context.to_string(),
                source,
            })
    }

    fn expectation(
        &self,
        context: &ItemContext,
        item: &ChangedItem,
        rules: &ReuseRules,
    ) -> Result<MarkerExpectation, ItemError> {
        let previous = self
            .resolver
            .resolve_previous(item)
            .map_err(|source| ItemError::Unreadable {
                item: context.to_string(),
                source,
            })?;

        let Some(previous) = previous else {
            return Ok(MarkerExpectation::Stamped);
        };

        let origin = format!(
            "Previous version {}@r{} of {}",
            previous.path, previous.revision, context
        );
        Ok(MarkerExpectation::from_reference_bytes(&origin, previous.as_bytes(), rules))
    }
}
