//! WooCommerce site-level data: API version, store settings, and the
//! simple-site list, plus currency formatting driven by those settings.

use std::collections::HashMap;
use std::sync::Arc;

use fluxsync::{Action, ChangeError, ChangeEvent, ErrorKind, LocalId, MemoryTable, Persistence, Reaction, Slice};
use tracing::debug;

use crate::client::{NetworkResult, WooCommerceClient};
use crate::model::{CurrencyPosition, Site, WcSettings, WcSimpleSite};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedApiVersionPayload {
    pub site: Site,
    pub result: NetworkResult<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSettingsPayload {
    pub site: Site,
    pub result: NetworkResult<Option<WcSettings>>,
}

#[derive(Action, Clone, Debug, PartialEq)]
pub enum WcCoreAction {
    FetchSiteApiVersion(Site),
    FetchSiteSettings(Site),
    FetchWooSimpleSites,

    FetchedSiteApiVersion(FetchedApiVersionPayload),
    FetchedSiteSettings(FetchedSettingsPayload),
    FetchedWooSimpleSites(NetworkResult<Vec<WcSimpleSite>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WcCoreChange {
    ApiVersion { site: LocalId, version: String },
    Settings { site: LocalId },
    SimpleSites { sites: Vec<Site> },
}

type WcCoreReaction = Reaction<WcCoreAction, WcCoreChange>;

pub struct WooCommerce {
    settings: MemoryTable<WcSettings>,
    api_versions: HashMap<LocalId, String>,
    simple_sites: Vec<Site>,
    client: Arc<dyn WooCommerceClient>,
}

impl WooCommerce {
    pub fn new(client: Arc<dyn WooCommerceClient>) -> Self {
        Self {
            settings: MemoryTable::new(),
            api_versions: HashMap::new(),
            simple_sites: Vec::new(),
            client,
        }
    }

    pub fn site_settings(&self, site: LocalId) -> Option<WcSettings> {
        self.settings.get_all_for_site(site).into_iter().next()
    }

    pub fn api_version(&self, site: LocalId) -> Option<&str> {
        self.api_versions.get(&site).map(String::as_str)
    }

    pub fn woo_simple_sites(&self) -> &[Site] {
        &self.simple_sites
    }

    /// Format `raw` using the stored settings of `site`
    pub fn format_currency(
        &self,
        raw: &str,
        site: LocalId,
        currency_code: Option<&str>,
        apply_decimal_formatting: bool,
    ) -> String {
        let settings = self.site_settings(site);
        format_currency_for_display(raw, settings.as_ref(), currency_code, apply_decimal_formatting)
    }

    fn fetched_api_version(&mut self, payload: FetchedApiVersionPayload) -> WcCoreReaction {
        let cause = WcCoreActionType::FetchedSiteApiVersion;
        let site = payload.site.local_id;
        match payload.result {
            Ok(version) if version.is_empty() => Reaction::unchanged().emit(ChangeEvent::failed(
                cause,
                ChangeError::new(ErrorKind::Api, "no_woo_api", "Site has no WooCommerce API"),
            )),
            Ok(version) => {
                debug!(store = Self::NAME, action = "FetchedSiteApiVersion", %site, %version, "api version");
                self.api_versions.insert(site, version.clone());
                Reaction::changed().emit(ChangeEvent::ok(cause, WcCoreChange::ApiVersion { site, version }))
            }
            Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
        }
    }

    fn fetched_settings(&mut self, payload: FetchedSettingsPayload) -> WcCoreReaction {
        let cause = WcCoreActionType::FetchedSiteSettings;
        let site = payload.site.local_id;
        match payload.result {
            Ok(Some(mut settings)) => {
                // Settings have no remote id; one row per site
                settings.local_id = self
                    .site_settings(site)
                    .map(|existing| existing.local_id)
                    .unwrap_or_default();
                settings.local_site_id = site;
                self.settings.upsert(settings);
                Reaction::changed().emit(ChangeEvent::ok(cause, WcCoreChange::Settings { site }))
            }
            Ok(None) => Reaction::unchanged().emit(ChangeEvent::failed(
                cause,
                ChangeError::generic("invalid_response", "Settings response was empty"),
            )),
            Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
        }
    }
}

impl Slice for WooCommerce {
    type Action = WcCoreAction;
    type Change = WcCoreChange;
    const NAME: &'static str = "wc_core";
    const DOMAIN: &'static str = WcCoreActionType::DOMAIN;

    fn reduce(&mut self, action: WcCoreAction) -> WcCoreReaction {
        match action {
            WcCoreAction::FetchSiteApiVersion(site) => {
                let client = self.client.clone();
                Reaction::unchanged().request(async move {
                    let result = client.fetch_api_version(&site).await;
                    WcCoreAction::FetchedSiteApiVersion(FetchedApiVersionPayload { site, result })
                })
            }
            WcCoreAction::FetchSiteSettings(site) => {
                let client = self.client.clone();
                Reaction::unchanged().request(async move {
                    let result = client.fetch_site_settings(&site).await;
                    WcCoreAction::FetchedSiteSettings(FetchedSettingsPayload { site, result })
                })
            }
            WcCoreAction::FetchWooSimpleSites => {
                let client = self.client.clone();
                Reaction::unchanged().request(async move {
                    WcCoreAction::FetchedWooSimpleSites(client.fetch_woo_simple_sites().await)
                })
            }

            WcCoreAction::FetchedSiteApiVersion(payload) => self.fetched_api_version(payload),
            WcCoreAction::FetchedSiteSettings(payload) => self.fetched_settings(payload),
            WcCoreAction::FetchedWooSimpleSites(Ok(sites)) => {
                self.simple_sites = sites.iter().map(WcSimpleSite::to_site).collect();
                Reaction::changed().emit(ChangeEvent::ok(
                    WcCoreActionType::FetchedWooSimpleSites,
                    WcCoreChange::SimpleSites {
                        sites: self.simple_sites.clone(),
                    },
                ))
            }
            WcCoreAction::FetchedWooSimpleSites(Err(error)) => Reaction::unchanged()
                .emit(ChangeEvent::failed(WcCoreActionType::FetchedWooSimpleSites, error)),
        }
    }
}

// ============================================================================
// Currency formatting
// ============================================================================

/// Display symbol for an ISO 4217 code; unknown codes are shown as-is
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "CNY" => "CN¥",
        "INR" => "₹",
        "KRW" => "₩",
        "BRL" => "R$",
        "AUD" => "A$",
        "CAD" => "CA$",
        "ILS" => "₪",
        "NGN" => "₦",
        "VND" => "₫",
        other => other,
    }
}

/// Format an amount for display.
///
/// A leading `-` in `raw` is always placed before the symbol. The currency
/// code falls back to the one in `settings`. When `settings` is present and
/// `apply_decimal_formatting` is set, the absolute value is rendered with the
/// site's decimal count and separators (unparseable input counts as zero);
/// otherwise `raw` is used verbatim, minus its sign. Without settings the
/// symbol goes on the left.
pub fn format_currency_for_display(
    raw: &str,
    settings: Option<&WcSettings>,
    currency_code: Option<&str>,
    apply_decimal_formatting: bool,
) -> String {
    let code = currency_code.or_else(|| settings.map(|s| s.currency_code.as_str()));
    let symbol = code.map(currency_symbol).unwrap_or_default();

    let value = match settings {
        Some(settings) if apply_decimal_formatting => {
            let amount = raw.trim().parse::<f64>().unwrap_or(0.0).abs();
            format_amount(amount, settings)
        }
        _ => raw.strip_prefix('-').unwrap_or(raw).to_string(),
    };

    let sign = if raw.starts_with('-') { "-" } else { "" };
    let position = settings.map(|s| s.currency_position).unwrap_or_default();
    match position {
        CurrencyPosition::Left => format!("{sign}{symbol}{value}"),
        CurrencyPosition::LeftSpace => format!("{sign}{symbol} {value}"),
        CurrencyPosition::Right => format!("{sign}{value}{symbol}"),
        CurrencyPosition::RightSpace => format!("{sign}{value} {symbol}"),
    }
}

/// Decimal places honored when formatting; site settings beyond this are clamped
const MAX_CURRENCY_DECIMALS: usize = 10;

fn format_amount(amount: f64, settings: &WcSettings) -> String {
    let decimals = usize::try_from(settings.currency_decimal_number)
        .unwrap_or(MAX_CURRENCY_DECIMALS)
        .min(MAX_CURRENCY_DECIMALS);
    let fixed = format!("{:.*}", decimals, amount);
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push_str(&settings.currency_thousand_separator);
        }
        out.push(digit);
    }
    if let Some(fraction) = fraction {
        out.push_str(&settings.currency_decimal_separator);
        out.push_str(fraction);
    }
    out
}
