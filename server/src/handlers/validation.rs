//! Script validation.

use super::parse_tier;
use crate::backend::FlexdexBackend;
use crate::error::{ServerError, ServerResult};
use flexdex_core::{validate, Tier, ValidationReport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ValidateScriptParams {
    pub script: String,
    /// Tier the script targets; defaults to the first entry of the fallback order
    #[serde(default)]
    pub tier: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateScriptResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl FlexdexBackend {
    pub fn handle_validate_script(
        &self,
        params: ValidateScriptParams,
    ) -> ServerResult<ValidateScriptResponse> {
        let tier = match parse_tier(params.tier.as_deref())? {
            Some(tier) => tier,
            None => self.default_tier()?,
        };
        let snapshot = self.snapshot();
        let report = validate(&snapshot, &params.script, tier, &self.config.validator);
        Ok(ValidateScriptResponse {
            valid: report.is_valid(),
            report,
        })
    }

    fn default_tier(&self) -> ServerResult<Tier> {
        self.config
            .validator
            .fallback_order
            .first()
            .copied()
            .ok_or_else(|| ServerError::invalid("tier", "no tier given and no fallback order configured"))
    }
}
