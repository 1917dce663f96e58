use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Static descriptive profile of an issuer. One per ticker, no history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyFacts {
    pub ticker: String,
    pub name: String,
    pub cik: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub category: Option<String>,
    pub exchange: Option<String>,
    pub is_active: bool,
    pub listing_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub market_cap: Option<f64>,
    pub number_of_employees: Option<u64>,
    pub sec_filings_url: Option<String>,
    pub sic_code: Option<String>,
    pub sic_industry: Option<String>,
    pub sic_sector: Option<String>,
    pub website_url: Option<String>,
    pub weighted_average_shares: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFactsResponse {
    pub company_facts: CompanyFacts,
}
