//! Marketplace collaborators around the pipeline: search, scoring, resale
//! estimation, negotiation drafting, and the deal dashboard.
//!
//! These carry fixed placeholder contracts; the scraping and valuation logic
//! is not wired up yet.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Filters applied to a marketplace search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilters {
    pub price_min: u32,
    pub price_max: u32,
    pub radius_km: u32,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
}

/// One marketplace listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: f64,
    pub location: String,
    pub url: String,
}

/// Search the marketplace for listings matching the filters.
#[derive(Debug, Default)]
pub struct SearchAutomation;

impl SearchAutomation {
    /// Scraping is not wired up yet; returns no listings.
    pub fn search(&self, filters: &SearchFilters) -> Result<Vec<Listing>> {
        debug!(
            "Searching {:?} in {:?} between {} and {}",
            filters.keywords, filters.categories, filters.price_min, filters.price_max
        );
        Ok(Vec::new())
    }
}

/// Score listings for resale potential.
#[derive(Debug, Default)]
pub struct ListingAnalysis;

impl ListingAnalysis {
    /// Scoring model not wired up yet; every listing rates 0.0.
    pub fn rate(&self, _listing: &Listing) -> f64 {
        0.0
    }
}

/// Estimate resale value from market data.
#[derive(Debug, Default)]
pub struct ResaleValueCalculator;

impl ResaleValueCalculator {
    /// Valuation data source not wired up yet; every estimate is 0.0.
    pub fn estimate(&self, _listing: &Listing) -> f64 {
        0.0
    }
}

/// Terms offered when opening a negotiation.
#[derive(Debug, Clone)]
pub struct NegotiationTerms {
    pub budget: f64,
    pub location: String,
    pub payment_method: String,
    pub persona: String,
}

/// Draft negotiation openers toward sellers using predefined personas.
#[derive(Debug)]
pub struct Negotiator {
    pub personas: Vec<&'static str>,
}

impl Default for Negotiator {
    fn default() -> Self {
        Negotiator {
            personas: vec![
                "Friendly Neighbor",
                "Market Expert",
                "Quick Closer",
                "Bargain Hunter",
            ],
        }
    }
}

impl Negotiator {
    /// Format an opening message for the seller.
    pub fn negotiate(&self, listing: &Listing, terms: &NegotiationTerms) -> String {
        format!(
            "Hello! I am interested in your listing '{}'. My budget is {}. \
             I can meet at {} and pay via {}.",
            listing.title, terms.budget, terms.location, terms.payment_method
        )
    }
}

/// A recorded deal: a listing with its analysis and drafted message.
#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub listing: Listing,
    pub score: f64,
    pub resale: f64,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Basic stats over the recorded deals.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_deals: usize,
}

/// Track deals and negotiations.
#[derive(Debug, Default)]
pub struct Dashboard {
    deals: Vec<Deal>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new deal in the dashboard.
    pub fn add_deal(&mut self, deal: Deal) {
        self.deals.push(deal);
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    /// Return basic stats about recorded deals.
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            total_deals: self.deals.len(),
        }
    }
}

#[cfg(test)]
#[path = "market_test.rs"]
mod market_test;
