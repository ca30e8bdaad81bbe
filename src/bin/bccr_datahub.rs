use bccr_datahub::api::{self, decode_periodicity, decode_range, IndicatorQuery};
use bccr_datahub::models::indicator::IndicatorResponse;
use bccr_datahub::repositories::SupabaseRepository;
use bccr_datahub::services::policy::IndicatorKind;
use bccr_datahub::{BccrScraper, Config, IndicatorService, IndicatorServiceTrait, Result};

use anyhow::{anyhow, Context};
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

fn build_service(config: &Config) -> anyhow::Result<IndicatorService> {
    let scraper = BccrScraper::new(config).context("failed to build scraper")?;
    let mut service = IndicatorService::new(Arc::new(scraper));
    match SupabaseRepository::from_config(config)? {
        Some(repository) => service = service.with_repository(Arc::new(repository)),
        None => info!("SUPABASE_URL/SUPABASE_KEY not set, persistence disabled"),
    }
    Ok(service)
}

fn envelope<T: Serialize>(result: Result<T>) -> anyhow::Result<String> {
    let response: IndicatorResponse<T> = result.into();
    Ok(serde_json::to_string_pretty(&response)?)
}

async fn fetch(service: &IndicatorService, matches: &ArgMatches) -> anyhow::Result<String> {
    let name = matches.value_of("indicator").unwrap_or_default();
    let kind = IndicatorKind::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = IndicatorKind::ALL.iter().map(|k| k.name()).collect();
        anyhow!("unknown indicator {}, expected one of: {}", name, known.join(", "))
    })?;

    let query = IndicatorQuery {
        date_from: matches.value_of("from").map(String::from),
        date_to: matches.value_of("to").map(String::from),
        periocity: matches.value_of("periodicity").map(String::from),
    };

    if matches.is_present("today") {
        return match kind {
            IndicatorKind::ExchangeRate => envelope(service.today_exchange_rate().await),
            IndicatorKind::BasicPassiveRate => envelope(service.today_basic_passive_rate().await),
            IndicatorKind::MonetaryPolicyRate => envelope(service.today_monetary_policy_rate().await),
            IndicatorKind::PrimeRate => envelope(service.today_prime_rate().await),
            IndicatorKind::CostaRicaInflationRate => envelope(service.today_costa_rica_inflation_rate().await),
            IndicatorKind::USAInflationRate => envelope(service.today_usa_inflation_rate().await),
            IndicatorKind::TreasuryRateUSA => envelope(service.today_treasury_rate_usa().await),
        };
    }

    if query.periocity.is_some() {
        let request = match decode_periodicity(&query) {
            Ok(request) => request,
            Err(e) => return envelope::<()>(Err(e)),
        };
        return match kind {
            IndicatorKind::ExchangeRate => envelope(service.exchange_rates_by_periodicity(request).await),
            IndicatorKind::CostaRicaInflationRate => {
                envelope(service.costa_rica_inflation_rates_by_periodicity(request).await)
            }
            other => Err(anyhow!("{} has no periodicity queries", other)),
        };
    }

    let request = match decode_range(&query, service.today()) {
        Ok(request) => request,
        Err(e) => return envelope::<()>(Err(e)),
    };
    match kind {
        IndicatorKind::ExchangeRate => envelope(service.exchange_rates(request).await),
        IndicatorKind::BasicPassiveRate => envelope(service.basic_passive_rates(request).await),
        IndicatorKind::MonetaryPolicyRate => envelope(service.monetary_policy_rates(request).await),
        IndicatorKind::PrimeRate => envelope(service.prime_rates(request).await),
        IndicatorKind::CostaRicaInflationRate => envelope(service.costa_rica_inflation_rates(request).await),
        IndicatorKind::USAInflationRate => envelope(service.usa_inflation_rates(request).await),
        IndicatorKind::TreasuryRateUSA => envelope(service.treasury_rates_usa(request).await),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = App::new("bccr_datahub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Costa Rican and USA financial indicators scraped from the BCCR")
        .arg(
            Arg::with_name("request-interval")
                .long("request-interval")
                .value_name("MILLIS")
                .help("Minimum delay between BCCR requests (defaults to $REQUEST_INTERVAL_MS or 0)")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("serve")
                .about("Serve the indicators over HTTP")
                .arg(
                    Arg::with_name("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on (defaults to $PORT or 8081)")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("allowed-origins")
                        .long("allowed-origins")
                        .value_name("ORIGINS")
                        .help("Comma separated CORS origins (defaults to $ALLOWED_ORIGINS)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("fetch")
                .about("Scrape one indicator and print the JSON response")
                .arg(
                    Arg::with_name("indicator")
                        .short('i')
                        .long("indicator")
                        .value_name("INDICATOR")
                        .help("exchange_rate, basic_passive_rate, monetary_policy_rate, prime_rate, costa_rica_inflation_rate, usa_inflation_rate or treasury_rate_usa")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("from")
                        .long("from")
                        .value_name("YYYY/MM/DD")
                        .help("Start of the range")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("to")
                        .long("to")
                        .value_name("YYYY/MM/DD")
                        .help("End of the range")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("periodicity")
                        .long("periodicity")
                        .value_name("PERIODICITY")
                        .help("quarterly, biannual, annual or quinquennium")
                        .takes_value(true)
                        .conflicts_with_all(&["from", "to"]),
                )
                .arg(
                    Arg::with_name("today")
                        .long("today")
                        .help("Find the most recent published value")
                        .takes_value(false)
                        .conflicts_with_all(&["from", "to", "periodicity"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("save-today")
                .about("Scrape today's exchange rate and store it"),
        );

    let matches = app.get_matches();
    let mut config = Config::from_env();
    let interval = matches
        .subcommand()
        .and_then(|(_, sub)| sub.value_of("request-interval"))
        .or_else(|| matches.value_of("request-interval"));
    if let Some(millis) = interval {
        let millis: u64 = millis.parse().context("invalid request interval")?;
        config = config.with_request_interval(Duration::from_millis(millis));
    }

    if let Some(matches) = matches.subcommand_matches("serve") {
        if let Some(port) = matches.value_of("port") {
            config = config.with_port(port.parse().context("invalid port")?);
        }
        if let Some(origins) = matches.value_of("allowed-origins") {
            config = config.with_allowed_origins(
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
            );
        }
        let service: Arc<dyn IndicatorServiceTrait> = Arc::new(build_service(&config)?);
        let app = api::app_router(service, &config.allowed_origins);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
            .await
            .with_context(|| format!("failed to bind port {}", config.port))?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, app).await?;
    } else if let Some(matches) = matches.subcommand_matches("fetch") {
        let service = build_service(&config)?;
        println!("{}", fetch(&service, matches).await?);
    } else if matches.subcommand_matches("save-today").is_some() {
        let service = build_service(&config)?;
        match service.save_today_exchange_rate().await {
            Ok(rate) => println!("{}", serde_json::to_string_pretty(&rate)?),
            Err(e) => {
                error!("Failed to save today's exchange rate: {}", e);
                return Err(e.into());
            }
        }
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}
