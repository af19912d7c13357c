use crate::dom::{ElementHandle, Page};
use crate::error::{Result, ScanError};
use crate::locator::{FieldRule, Locator, StrategyTable, ValueSource, derived_locator, first_match};
use crate::result::{FieldValue, RawRecord};
use tracing::{debug, warn};

/// Resolves requested fields against a record-bearing node.
///
/// Resolution order for a field: the candidates declared in the strategy
/// table, then a locator guessed from the field name (`"Unit Price"` ->
/// `.unit-price`). A field that nothing matches comes back as
/// [`FieldValue::Unavailable`]; only backend failures are errors.
pub struct FieldExtractor<'t> {
    table: &'t StrategyTable,
}

impl<'t> FieldExtractor<'t> {
    pub fn new(table: &'t StrategyTable) -> Self {
        Self { table }
    }

    /// Candidate list for `field` in evaluation order
    pub fn candidates_for(&self, field: &str) -> Vec<Locator> {
        let mut candidates = self
            .table
            .rule_for(field)
            .map(|rule| rule.candidates.clone())
            .unwrap_or_default();

        if let Some(guess) = derived_locator(field)
            && !candidates.contains(&guess)
        {
            candidates.push(guess);
        }
        candidates
    }

    pub fn extract_field<P: Page + ?Sized>(
        &self,
        page: &P,
        node: &ElementHandle,
        field: &str,
    ) -> Result<FieldValue> {
        let default_rule = FieldRule::default();
        let rule = self.table.rule_for(field).unwrap_or(&default_rule);
        let candidates = self.candidates_for(field);

        let hit = first_match(&candidates, |locator| {
            let element = match page.find_one(Some(node), locator) {
                Ok(Some(element)) => element,
                Ok(None) => return Ok(None),
                Err(ScanError::InvalidLocator(msg)) => {
                    warn!("Skipping candidate {} for '{}': {}", locator, field, msg);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            let raw = match rule.source {
                ValueSource::Text => Some(page.text(&element)?),
                ValueSource::Attribute(ref name) => page.attribute(&element, name)?,
            };

            // An element with nothing in it does not count as a match
            Ok(raw
                .map(|raw| rule.finish(&raw))
                .filter(|value| !value.is_empty()))
        })?;

        Ok(match hit {
            Some((idx, value)) => {
                debug!("'{}' resolved by {} on {}", field, candidates[idx], node);
                FieldValue::Text(value)
            }
            None => {
                debug!("'{}' unavailable on {}", field, node);
                FieldValue::Unavailable
            }
        })
    }

    /// Build one record holding every requested field, in request order
    pub fn extract_record<P: Page + ?Sized>(
        &self,
        page: &P,
        node: &ElementHandle,
        fields: &[String],
    ) -> Result<RawRecord> {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            values.push((field.clone(), self.extract_field(page, node, field)?));
        }
        Ok(RawRecord::new(values))
    }
}
