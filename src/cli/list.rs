use strum::IntoEnumIterator;
use table::Table;
mod table;

use crate::{
    backends::backends::Provider,
    registry::populate::populated_system,
    registry::registry::ModelRecord,
    system::ModelSystem,
    ListArgs, ListModelArgs, ListObject, ListingFormat,
};

#[derive(serde::Serialize)]
struct ModelRow {
    id: String,
    name: String,
    provider: Provider,
    local: bool,
    active: bool,
    description: String,
}

impl From<Vec<ModelRow>> for Table {
    fn from(value: Vec<ModelRow>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["ACTIVE", "ID", "PROVIDER", "LOCALITY", "DESCRIPTION"]);

        for model in value {
            tab.add_row(vec![
                if model.active { "*" } else { "" }.to_string(),
                model.id,
                model.provider.to_string(),
                if model.local { "local" } else { "remote" }.to_string(),
                model.description,
            ]);
        }

        tab
    }
}

#[derive(serde::Serialize)]
struct ProviderRow {
    provider: Provider,
    backend: bool,
    credentials: bool,
    models: usize,
}

impl From<Vec<ProviderRow>> for Table {
    fn from(value: Vec<ProviderRow>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["PROVIDER", "BACKEND", "CREDENTIALS", "MODELS"]);

        for provider in value {
            tab.add_row(vec![
                provider.provider.to_string(),
                if provider.backend { "active" } else { "inactive" }.to_string(),
                if provider.credentials { "set" } else { "unset" }.to_string(),
                provider.models.to_string(),
            ]);
        }

        tab
    }
}

fn model_rows(system: &ModelSystem, args: &ListModelArgs) -> Vec<ModelRow> {
    let records: Vec<&ModelRecord> = if args.local {
        system.available_local_models()
    } else if args.cloud {
        system.available_cloud_models()
    } else {
        system.available_models()
    };

    let active_id = system.active_model().map(|record| record.id.clone());

    records
        .into_iter()
        .filter(|record| args.provider.map_or(true, |p| record.provider == p))
        .map(|record| ModelRow {
            id: record.id.clone(),
            name: record.name.clone(),
            provider: record.provider,
            local: record.is_local,
            active: active_id.as_deref() == Some(record.id.as_str()),
            description: record.description.clone(),
        })
        .collect()
}

fn provider_rows(system: &ModelSystem) -> Vec<ProviderRow> {
    Provider::iter()
        .map(|id| ProviderRow {
            provider: id,
            backend: system.has_backend(id),
            credentials: system.credentials(id).is_some(),
            models: system
                .available_models()
                .iter()
                .filter(|record| record.provider == id)
                .count(),
        })
        .collect()
}

fn format_output<O: Into<Table> + serde::Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => {
            let output = serde_json::to_string_pretty(&object).expect("failed to serialize object");

            println!("{}", output);
        }
        ListingFormat::Table => {
            let tab: Table = object.into();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab: Table = object.into();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

pub(crate) async fn list_cmd(config: &crate::config::Config, args: &ListArgs) {
    let format = args.format;

    let system = populated_system(config).await;

    match &args.object {
        ListObject::Models(margs) => {
            format_output(model_rows(&system, margs), format);
        }
        ListObject::Providers => {
            format_output(provider_rows(&system), format);
        }
    }
}
