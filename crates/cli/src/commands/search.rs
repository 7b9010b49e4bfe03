use serde::Serialize;
use tarifa_core::config::LoadOptions;
use tarifa_core::cpq::catalog::{PricedHit, MIN_QUERY_CHARS};
use tarifa_core::errors::ApplicationError;
use tarifa_documents::format_money;

use super::{load_config, open_session, select_tariff, CommandResult};

const COMMAND: &str = "search";

#[derive(Debug, Serialize)]
struct SearchPayload {
    tariff: String,
    query: String,
    hits: Vec<PricedHit>,
}

pub fn run(query: &str, tariff: Option<&str>, json: bool, options: LoadOptions) -> CommandResult {
    match execute(query, tariff, options) {
        Ok(payload) if json => {
            let message = format!("{} result(s) for `{}`", payload.hits.len(), payload.query);
            CommandResult::success_with_data(COMMAND, message, Some(payload))
        }
        Ok(payload) => CommandResult::text(render_text(&payload)),
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

fn execute(
    query: &str,
    tariff: Option<&str>,
    options: LoadOptions,
) -> Result<SearchPayload, ApplicationError> {
    let config = load_config(options)?;
    let tariff = select_tariff(tariff, &config)?;
    let session = open_session(tariff, &config)?;
    let hits = session.search_priced(query);

    tracing::debug!(
        event_name = "catalog.search.completed",
        tariff = %tariff,
        hits = hits.len(),
        "search completed"
    );

    Ok(SearchPayload {
        tariff: tariff.display_name().to_string(),
        query: query.trim().to_string(),
        hits,
    })
}

fn render_text(payload: &SearchPayload) -> String {
    if payload.query.chars().count() < MIN_QUERY_CHARS {
        return format!("Escribe al menos {MIN_QUERY_CHARS} caracteres para buscar.");
    }
    if payload.hits.is_empty() {
        return format!("Sin resultados para \"{}\" en Tarifa {}.", payload.query, payload.tariff);
    }

    let mut lines = vec![format!(
        "{} resultado(s) para \"{}\" en Tarifa {}:",
        payload.hits.len(),
        payload.query,
        payload.tariff
    )];

    for hit in &payload.hits {
        let price = &hit.price;
        lines.push(format!("- {} {}", hit.product.reference, hit.product.description));
        lines.push(format!(
            "    PVP {} € | Dto. {} | Precio {} €",
            format_money(price.base_price),
            price.discount_label(),
            format_money(price.final_unit_price)
        ));
        if price.has_net_condition() {
            lines.push(format!("    Neto: {}", price.net_condition_text));
        }
        if let Some(stock) = &hit.stock {
            lines.push(format!("    Stock: {} ({})", stock.state.label(), stock.quantity));
        }
    }

    lines.join("\n")
}
