//! Yahoo Finance data provider.
//!
//! Daily bars come from the v8 chart API, metrics, profile and market cap from
//! the v10 quoteSummary API, and news from the v1 search API. All three share
//! one transport path with retries, exponential backoff and the circuit
//! breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Payload mapping lives in pure `parse_*` functions so it can be
//! tested without the network.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataProvider, FetchError};
use crate::config::ProviderConfig;
use crate::domain::{CompanyFacts, CompanyNews, FinancialMetrics, Period, Price};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const SUMMARY_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile,quoteType";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// v10 quoteSummary response. Modules are kept as loose JSON and flattened
/// into [`SummaryFields`].
#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<BTreeMap<String, Value>>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

/// v1 search response; only the news section is used.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNewsItem>,
}

#[derive(Debug, Deserialize)]
struct SearchNewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "providerPublishTime", default)]
    provider_publish_time: i64,
}

/// Every field of every summary module, first module wins on a name clash.
#[derive(Debug, Default)]
struct SummaryFields {
    fields: BTreeMap<String, Value>,
}

impl SummaryFields {
    fn from_modules(modules: BTreeMap<String, Value>) -> Self {
        let mut fields = BTreeMap::new();
        for name in SUMMARY_MODULES.split(',') {
            if let Some(Value::Object(module)) = modules.get(name) {
                for (key, value) in module {
                    fields.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        Self { fields }
    }

    /// Numeric field, unwrapping Yahoo's `{raw, fmt}` wrapper. Non-finite
    /// values are unknown.
    fn number(&self, key: &str) -> Option<f64> {
        let value = self.fields.get(key)?;
        let raw = match value {
            Value::Object(wrapper) => wrapper.get("raw")?.as_f64(),
            other => other.as_f64(),
        }?;
        raw.is_finite().then_some(raw)
    }

    fn integer(&self, key: &str) -> Option<u64> {
        self.number(key)
            .filter(|v| *v >= 0.0)
            .map(|v| v.round() as u64)
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
    chart_base_url: String,
    summary_base_url: String,
    search_base_url: String,
}

impl YahooProvider {
    pub fn new(
        config: &ProviderConfig,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
            chart_base_url: config.chart_base_url.trim_end_matches('/').to_string(),
            summary_base_url: config.summary_base_url.trim_end_matches('/').to_string(),
            search_base_url: config.search_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Provider with its own breaker built from the config.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, FetchError> {
        let breaker = CircuitBreaker::new(
            config.breaker_cooldown(),
            config.breaker_failure_threshold,
        );
        Self::new(config, Arc::new(breaker))
    }

    /// GET `url` and decode the JSON body, with retry and circuit breaker logic.
    ///
    /// A 404 body is still decoded: Yahoo reports unknown symbols as a 404
    /// carrying a structured `Not Found` error.
    fn get_json<T: DeserializeOwned>(&self, symbol: &str, url: &str) -> Result<T, FetchError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                tracing::debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                // IP ban
                self.circuit_breaker.trip();
                return Err(FetchError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(FetchError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(FetchError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            if status.is_server_error() {
                last_error = Some(FetchError::HttpStatus {
                    status: status.as_u16(),
                });
                continue;
            }

            if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                });
            }

            let body = resp
                .text()
                .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;
            let decoded = serde_json::from_str::<T>(&body).map_err(|e| {
                if status.is_success() {
                    FetchError::ResponseFormatChanged(format!(
                        "failed to parse response for {symbol}: {e}"
                    ))
                } else {
                    FetchError::HttpStatus {
                        status: status.as_u16(),
                    }
                }
            })?;
            self.circuit_breaker.record_success();
            return Ok(decoded);
        }

        self.circuit_breaker.record_failure();
        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }

    fn quote_summary(&self, symbol: &str) -> Result<Option<SummaryFields>, FetchError> {
        let url = endpoint_url(
            &self.summary_base_url,
            &["v10", "finance", "quoteSummary", symbol],
            &[("modules", SUMMARY_MODULES)],
        )?;
        let resp: QuoteSummaryResponse = self.get_json(symbol, &url)?;
        parse_quote_summary(resp)
    }
}

/// `base` joined with `segments` and a query. Each segment is percent-encoded,
/// so a symbol can never add path components or query parameters.
fn endpoint_url(
    base: &str,
    segments: &[&str],
    params: &[(&str, &str)],
) -> Result<String, FetchError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| FetchError::Other(format!("invalid base url '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| FetchError::Other(format!("base url cannot carry a path: '{base}'")))?
        .pop_if_empty()
        .extend(segments);
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.into())
}

/// Chart API URL for a symbol and an inclusive date range.
fn chart_url(
    base: &str,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<String, FetchError> {
    let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp().to_string();
    let end_ts = (end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399).to_string();
    endpoint_url(
        base,
        &["v8", "finance", "chart", symbol],
        &[
            ("period1", start_ts.as_str()),
            ("period2", end_ts.as_str()),
            ("interval", "1d"),
        ],
    )
}

fn search_url(base: &str, symbol: &str, limit: usize) -> Result<String, FetchError> {
    let count = limit.to_string();
    endpoint_url(
        base,
        &["v1", "finance", "search"],
        &[
            ("q", symbol),
            ("newsCount", count.as_str()),
            ("quotesCount", "0"),
        ],
    )
}

fn epoch_date(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

/// Map a chart response to bars. Unknown symbols and empty ranges are an
/// empty sequence.
fn parse_chart(resp: ChartResponse) -> Result<Vec<Price>, FetchError> {
    let Some(result) = resp.chart.result else {
        return match resp.chart.error {
            Some(err) if err.code == "Not Found" => Ok(Vec::new()),
            Some(err) => Err(FetchError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            ))),
            None => Ok(Vec::new()),
        };
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::ResponseFormatChanged("no quote data".into()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let time = epoch_date(ts)
            .ok_or_else(|| FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        // Holidays come back as all-null rows; partial rows are not trusted either.
        let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
            continue;
        };

        let bar = Price {
            time,
            open,
            high,
            low,
            close,
            volume: volume.unwrap_or(0),
        };
        if !bar.is_sane() {
            tracing::debug!(%time, "skipping malformed bar");
            continue;
        }
        bars.push(bar);
    }

    Ok(bars)
}

fn parse_quote_summary(resp: QuoteSummaryResponse) -> Result<Option<SummaryFields>, FetchError> {
    if let Some(err) = resp.quote_summary.error {
        if err.code == "Not Found" {
            return Ok(None);
        }
        return Err(FetchError::ResponseFormatChanged(format!(
            "{}: {}",
            err.code, err.description
        )));
    }
    Ok(resp
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .map(SummaryFields::from_modules))
}

fn metrics_from_summary(
    ticker: &str,
    end_date: NaiveDate,
    period: Period,
    f: &SummaryFields,
) -> FinancialMetrics {
    let currency = f
        .text("currency")
        .or_else(|| f.text("financialCurrency"))
        .unwrap_or_else(|| "USD".into());

    let mut m = FinancialMetrics::new(ticker, end_date, period, currency);
    m.market_cap = f.number("marketCap");
    m.enterprise_value = f.number("enterpriseValue");
    m.price_to_earnings_ratio = f.number("trailingPE");
    m.price_to_book_ratio = f.number("priceToBook");
    m.price_to_sales_ratio = f.number("priceToSalesTrailing12Months");
    m.enterprise_value_to_ebitda_ratio = f.number("enterpriseToEbitda");
    m.enterprise_value_to_revenue_ratio = f.number("enterpriseToRevenue");
    m.free_cash_flow_yield = f.number("freeCashflowYield");
    m.peg_ratio = f.number("pegRatio");
    m.gross_margin = f.number("grossMargins");
    m.operating_margin = f.number("operatingMargins");
    m.net_margin = f.number("profitMargins");
    m.return_on_equity = f.number("returnOnEquity");
    m.return_on_assets = f.number("returnOnAssets");
    m.return_on_invested_capital = f.number("returnOnInvestedCapital");
    m.asset_turnover = f.number("assetTurnover");
    m.inventory_turnover = f.number("inventoryTurnover");
    m.receivables_turnover = f.number("receivablesTurnover");
    m.days_sales_outstanding = f.number("daysSalesOutstanding");
    m.operating_cycle = f.number("operatingCycle");
    m.working_capital_turnover = f.number("workingCapitalTurnover");
    m.current_ratio = f.number("currentRatio");
    m.quick_ratio = f.number("quickRatio");
    m.cash_ratio = f.number("cashRatio");
    m.operating_cash_flow_ratio = f.number("operatingCashflowRatio");
    m.debt_to_equity = f.number("debtToEquity");
    m.debt_to_assets = f.number("debtToAssets");
    m.interest_coverage = f.number("interestCoverage");
    m.revenue_growth = f.number("revenueGrowth");
    m.earnings_growth = f.number("earningsGrowth");
    m.book_value_growth = f.number("bookValueGrowth");
    m.earnings_per_share_growth = f.number("earningsQuarterlyGrowth");
    m.free_cash_flow_growth = f.number("freeCashflowGrowth");
    m.operating_income_growth = f.number("operatingIncomeGrowth");
    m.ebitda_growth = f.number("ebitdaGrowth");
    m.payout_ratio = f.number("payoutRatio");
    m.earnings_per_share = f.number("trailingEps");
    m.book_value_per_share = f.number("bookValue");
    m.free_cash_flow_per_share = f.number("freeCashflowPerShare");
    m
}

fn facts_from_summary(ticker: &str, f: &SummaryFields) -> CompanyFacts {
    let industry = f.text("industry");
    let sector = f.text("sector");
    CompanyFacts {
        ticker: ticker.to_string(),
        name: f
            .text("longName")
            .or_else(|| f.text("shortName"))
            .unwrap_or_default(),
        cik: f.text("cik"),
        industry: industry.clone(),
        sector: sector.clone(),
        category: f.text("category"),
        exchange: f.text("exchange").or_else(|| f.text("exchangeName")),
        is_active: true,
        listing_date: f
            .number("firstTradeDateEpochUtc")
            .and_then(|ts| epoch_date(ts as i64)),
        location: f.text("country"),
        market_cap: f.number("marketCap"),
        number_of_employees: f.integer("fullTimeEmployees"),
        sec_filings_url: f.text("secFilingsUrl"),
        sic_code: f.text("sicCode"),
        sic_industry: industry,
        sic_sector: sector,
        website_url: f.text("website"),
        weighted_average_shares: f.integer("sharesOutstanding"),
    }
}

/// News items published within `[start, end]`, at most `limit` of them.
fn parse_news(
    ticker: &str,
    resp: SearchResponse,
    start: Option<NaiveDate>,
    end: NaiveDate,
    limit: usize,
) -> Vec<CompanyNews> {
    resp.news
        .into_iter()
        .filter_map(|item| {
            let date = epoch_date(item.provider_publish_time)?;
            let in_window = start.map_or(true, |s| date >= s) && date <= end;
            in_window.then(|| CompanyNews {
                ticker: ticker.to_string(),
                title: item.title,
                author: item.publisher.clone(),
                source: item.publisher,
                date,
                url: item.link,
                sentiment: None,
            })
        })
        .take(limit)
        .collect()
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Price>, FetchError> {
        let url = chart_url(&self.chart_base_url, ticker, start, end)?;
        let resp: ChartResponse = self.get_json(ticker, &url)?;
        parse_chart(resp)
    }

    fn fetch_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        period: Period,
    ) -> Result<Vec<FinancialMetrics>, FetchError> {
        Ok(self
            .quote_summary(ticker)?
            .map(|f| vec![metrics_from_summary(ticker, end_date, period, &f)])
            .unwrap_or_default())
    }

    fn fetch_company_news(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: NaiveDate,
        limit: usize,
    ) -> Result<Vec<CompanyNews>, FetchError> {
        let url = search_url(&self.search_base_url, ticker, limit)?;
        let resp: SearchResponse = self.get_json(ticker, &url)?;
        Ok(parse_news(ticker, resp, start, end, limit))
    }

    fn fetch_company_facts(&self, ticker: &str) -> Result<CompanyFacts, FetchError> {
        self.quote_summary(ticker)?
            .map(|f| facts_from_summary(ticker, &f))
            .ok_or_else(|| FetchError::SymbolNotFound {
                symbol: ticker.to_string(),
            })
    }

    fn fetch_market_cap(
        &self,
        ticker: &str,
        _end_date: NaiveDate,
    ) -> Result<Option<f64>, FetchError> {
        Ok(self
            .quote_summary(ticker)?
            .and_then(|f| f.number("marketCap")))
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
