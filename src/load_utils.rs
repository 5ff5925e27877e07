// load_utils.rs
use crate::pivot_utils::CycleId;
use crate::table_utils::{parse_numeric, TableBuilder};
use anyhow::{anyhow, bail, Context, Result as AnyhowResult};
use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs::{metadata, read_dir};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// File-name suffix of the per-cycle market price workbooks.
pub const PRICE_FILE_SUFFIX: &str = "_ICSM_analyse";
/// File-name suffix of the per-cycle basket cost workbooks.
pub const MEB_FILE_SUFFIX: &str = "_MEB_analyse";

/// Label of the whole-country aggregate geography, pinned last among pivot columns.
pub const WHOLE_COUNTRY: &str = "Tout le pays";
/// Label of the all-sectors total, pinned last among pivot rows.
pub const TOTAL_LABEL: &str = "Total";

/// Name of the period column injected into every loaded table.
pub const CYCLE_COLUMN: &str = "Cycle";

lazy_static! {
    /// Maps each basket value column to the humanitarian sector it belongs to.
    static ref SECTOR_MAPPING: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        // ABNA
        m.insert("MEB_cooking_pot", "ABNA");
        m.insert("MEB_bowl", "ABNA");
        m.insert("MEB_mug", "ABNA");
        m.insert("MEB_spoon", "ABNA");
        m.insert("MEB_serving_spoon", "ABNA");
        m.insert("MEB_knife", "ABNA");
        m.insert("MEB_scouring_pad", "ABNA");
        m.insert("MEB_blanket", "ABNA");
        m.insert("MEB_carpet_price_item", "ABNA");
        m.insert("MEB_charcoal", "ABNA");
        m.insert("MEB_stove", "ABNA");
        m.insert("MEB_pan", "ABNA");
        m.insert("MEB_cooking_pot_with_lid", "ABNA");
        m.insert("MEB_plate", "ABNA");
        m.insert("MEB_fork", "ABNA");
        m.insert("MEB_kitchen_knife", "ABNA");
        m.insert("MEB_sleeping_mat", "ABNA");
        m.insert("MEB_cooking_fuel", "ABNA");
        m.insert("MEB_abna_basket", "ABNA");
        // WASH
        m.insert("MEB_tub", "WASH");
        m.insert("MEB_water_bottle", "WASH");
        m.insert("MEB_laundry_soap_bar", "WASH");
        m.insert("MEB_toothbrush_adult", "WASH");
        m.insert("MEB_toothpaste", "WASH");
        m.insert("MEB_toilet_paper", "WASH");
        m.insert("MEB_sanitary_pad", "WASH");
        m.insert("MEB_soap", "WASH");
        m.insert("MEB_water_container_small", "WASH");
        m.insert("MEB_water_container", "WASH");
        m.insert("MEB_deodorant", "WASH");
        m.insert("MEB_WASH_basket", "WASH");
        // ABNA Shelter
        m.insert("MEB_rope", "ABNA Shelter");
        m.insert("MEB_nails_50mm", "ABNA Shelter");
        m.insert("MEB_nails_75mm", "ABNA Shelter");
        m.insert("MEB_nails_63mm", "ABNA Shelter");
        m.insert("MEB_roll_tie_wire", "ABNA Shelter");
        m.insert("MEB_hammer", "ABNA Shelter");
        m.insert("MEB_shovel", "ABNA Shelter");
        m.insert("MEB_pair_of_shears", "ABNA Shelter");
        m.insert("MEB_hoe", "ABNA Shelter");
        m.insert("MEB_pickaxe", "ABNA Shelter");
        m.insert("MEB_ABNA_shelter_basket", "ABNA Shelter");
        // Protection
        m.insert("MEB_torch", "Protection");
        m.insert("MEB_sim_card", "Protection");
        m.insert("MEB_mobile_phone", "Protection");
        m.insert("MEB_carte_telephone", "Protection");
        m.insert("MEB_Protection_basket", "Protection");
        // Santé
        m.insert("MEB_mosquito_net", "Santé");
        m.insert("MEB_depanse_median_sante", "Santé");
        m.insert("MEB_sante_basket", "Santé");
        // Education
        m.insert("MEB_depanse_median_education", "Education");
        m.insert("MEB_Education_basket", "Education");
        // Total
        m.insert("MEB_total", "Total");
        m
    };
}

/// The immutable dataset handle produced by the initialization step and passed into
/// each page. No writer mutates it after loading.
#[derive(Debug)]
pub struct Dataset {
    /// Full long-format price table, all subjects and currencies.
    pub prices: TableBuilder,
    /// Price table narrowed to median prices in gourdes, the default page view.
    pub prices_filtered: TableBuilder,
    /// Long-format basket cost table.
    pub meb: TableBuilder,
}

impl Dataset {
    /// Loads and prepares both datasets from a directory of per-cycle workbooks.
    pub fn load(data_dir: &str) -> AnyhowResult<Self> {
        let raw_prices = load_cycle_tables(data_dir, PRICE_FILE_SUFFIX)?;
        let (prices, prices_filtered) = prepare_price_tables(&raw_prices)?;

        let raw_meb = load_cycle_tables(data_dir, MEB_FILE_SUFFIX)?;
        let meb = prepare_meb_table(&raw_meb)?;

        Ok(Dataset {
            prices,
            prices_filtered,
            meb,
        })
    }
}

/// Loads every per-cycle file named `<cycle>_<suffix>.{xlsx,xls,csv}` under
/// `data_dir`, injects the period as a `Cycle` column, and concatenates the cycles
/// into one long table.
///
/// Aborts with a descriptive error when no file matches the naming convention;
/// silently proceeding with an empty dataset is not an option. Files whose stem is
/// not a valid `cycle_<n>` label are skipped with a warning.
pub fn load_cycle_tables(data_dir: &str, file_suffix: &str) -> AnyhowResult<TableBuilder> {
    let pattern = Regex::new(&format!(
        r"^(?P<stem>.+){}\.(?P<ext>xlsx|xls|csv)$",
        regex::escape(file_suffix)
    ))?;

    let mut cycle_files: Vec<(CycleId, String, String)> = Vec::new();

    let entries = read_dir(data_dir)
        .with_context(|| format!("cannot read data directory '{}'", data_dir))?;
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();

        let captures = match pattern.captures(&file_name) {
            Some(captures) => captures,
            None => continue,
        };
        let stem = &captures["stem"];

        match CycleId::parse(stem) {
            Some(cycle) => {
                let path = entry.path().to_string_lossy().to_string();
                cycle_files.push((cycle, path, captures["ext"].to_string()));
            }
            None => {
                log::warn!(
                    "skipping '{}': stem '{}' is not a cycle label",
                    file_name,
                    stem
                );
            }
        }
    }

    if cycle_files.is_empty() {
        bail!(
            "no data files matching '*{}.(xlsx|xls|csv)' found in '{}'",
            file_suffix,
            data_dir
        );
    }

    cycle_files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut merged = TableBuilder::new();
    for (cycle, path, ext) in cycle_files {
        let mut table = match ext.as_str() {
            "xlsx" => TableBuilder::from_xlsx(&path, "1", "SHEET_ID"),
            "xls" => TableBuilder::from_xls(&path, "1", "SHEET_ID"),
            _ => TableBuilder::from_csv(&path),
        };

        if let Some(error) = table.get_error() {
            return Err(anyhow!("error reading the file '{}': {}", path, error));
        }
        if !table.has_headers() {
            bail!("the file '{}' holds no header row", path);
        }

        table.append_static_value_column(&cycle.label(), CYCLE_COLUMN);
        merged.append_table(&table);
    }

    Ok(merged)
}

/// Lists the per-cycle files matching the naming convention, with their last-modified
/// timestamp and size in megabytes.
pub fn list_cycle_files(data_dir: &str, file_suffix: &str) -> AnyhowResult<TableBuilder> {
    let pattern = Regex::new(&format!(
        r"^.+{}\.(xlsx|xls|csv)$",
        regex::escape(file_suffix)
    ))?;

    let mut listing = TableBuilder::new();
    listing.set_header(vec!["file_name", "last_modified", "mb_size"]);

    let mut names: Vec<String> = Vec::new();
    let entries = read_dir(data_dir)
        .with_context(|| format!("cannot read data directory '{}'", data_dir))?;
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if pattern.is_match(&file_name) {
            names.push(file_name);
        }
    }
    names.sort();

    for file_name in names {
        let file_path = Path::new(data_dir).join(&file_name);
        let meta = metadata(&file_path)?;
        let modified_time = meta.modified()?;
        let file_size_mb = meta.len() as f64 / (1024.0 * 1024.0);

        let timestamp = modified_time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let datetime: DateTime<Utc> = Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .ok_or_else(|| anyhow!("invalid modification timestamp on '{}'", file_name))?;

        let formatted_timestamp = datetime.format("%Y-%m-%d %H:%M:%S").to_string();
        let formatted_file_size = format!("{:.2}", file_size_mb);
        listing.add_row(vec![&file_name, &formatted_timestamp, &formatted_file_size]);
    }

    Ok(listing)
}

/// Prepares the price observation tables from the merged per-cycle workbooks.
///
/// Derives the `Produit` and `currency` dimensions, relabels the whole-evaluation
/// geography to the whole-country label, and returns both the full table and the
/// default view narrowed to median prices in gourdes.
pub fn prepare_price_tables(
    raw: &TableBuilder,
) -> AnyhowResult<(TableBuilder, TableBuilder)> {
    raw.require_columns(&[
        "question_variable_label",
        "Filtre",
        "Sujet",
        "Sector",
        "Disag",
        "Value",
        CYCLE_COLUMN,
    ])?;

    let mut full = raw.from_copy();

    full.append_derived_column("Produit", |row| {
        row.get("question_variable_label").to_string()
    });
    full.append_derived_column("currency", |row| {
        if row
            .get("question_variable_label")
            .to_lowercase()
            .contains("usd")
        {
            "USD".to_string()
        } else {
            "HTG".to_string()
        }
    });
    full.relabel_cells(
        vec!["Filtre", "Disag"],
        "Toute l'evaluation",
        WHOLE_COUNTRY,
    );

    let mut filtered = full.from_copy();
    filtered.where_eq(vec![("Sujet", "Prix median"), ("currency", "HTG")]);
    if !filtered.has_data() {
        log::warn!("no median-price observations in gourdes after filtering");
    }

    Ok((full, filtered))
}

/// Prepares the long-format basket cost table from the merged per-cycle workbooks.
///
/// Drops rows without a computation basis, appends USD-converted copies of the
/// emergency market rows, relabels the geography and crisis-type dimensions, melts
/// the wide `MEB_*` value columns to long format, and tags each product with its
/// sector and basket flags.
pub fn prepare_meb_table(raw: &TableBuilder) -> AnyhowResult<TableBuilder> {
    raw.require_columns(&[
        "Type_meb",
        "meb_par",
        "currency",
        "zone",
        "USD_official",
        CYCLE_COLUMN,
    ])?;

    let headers = raw
        .get_headers()
        .ok_or_else(|| anyhow!("the basket cost table holds no header row"))?
        .to_vec();
    let meb_columns: Vec<String> = headers
        .iter()
        .filter(|h| h.starts_with("MEB_"))
        .cloned()
        .collect();
    if meb_columns.is_empty() {
        bail!("no 'MEB_' value columns found in the basket cost data");
    }

    let mut table = raw.from_copy();
    table.drop_rows_where_empty("meb_par");

    append_usd_conversion_rows(&mut table, &meb_columns);

    table.trim_all();
    table.relabel_cells(vec!["zone"], "pays", WHOLE_COUNTRY);
    table.relabel_cells(vec!["Type_meb"], "Crise prolongée", "MEB crise prolongée");
    table.relabel_cells(vec!["Type_meb"], "Urgence", "MEB crise d'urgence");

    let id_vars = vec!["currency", "zone", "Type_meb", "meb_par", CYCLE_COLUMN];
    let value_vars: Vec<&str> = meb_columns.iter().map(|c| c.as_str()).collect();
    table.melt(id_vars, value_vars, "Product", "Value");

    table.append_derived_column("sector", |row| {
        SECTOR_MAPPING
            .get(row.get("Product"))
            .map(|sector| sector.to_string())
            .unwrap_or_default()
    });
    table.append_derived_column("is_basket", |row| {
        let product = row.get("Product");
        let is_basket = product.to_lowercase().contains("basket") || product == "MEB_total";
        is_basket.to_string()
    });
    table.append_derived_column("is_total", |row| {
        (row.get("Product") == "MEB_total").to_string()
    });

    Ok(table)
}

/// Appends USD-converted copies of the emergency market rows: same observation, the
/// currency relabeled, every basket value divided by the official exchange rate.
/// Rows without a usable rate are skipped rather than converted into infinities.
fn append_usd_conversion_rows(table: &mut TableBuilder, meb_columns: &[String]) {
    let headers = match table.get_headers() {
        Some(headers) => headers.to_vec(),
        None => return,
    };

    let col_of = |name: &str| headers.iter().position(|h| h == name);
    let (type_idx, par_idx, currency_idx, rate_idx) = match (
        col_of("Type_meb"),
        col_of("meb_par"),
        col_of("currency"),
        col_of("USD_official"),
    ) {
        (Some(t), Some(p), Some(c), Some(r)) => (t, p, c, r),
        _ => return,
    };
    let meb_indices: Vec<usize> = meb_columns.iter().filter_map(|c| col_of(c)).collect();

    let mut converted_rows: Vec<Vec<String>> = Vec::new();
    if let Some(data) = table.get_data() {
        for row in data {
            let cell = |idx: usize| row.get(idx).map(|c| c.trim()).unwrap_or("");
            if cell(type_idx) != "Urgence" || cell(par_idx) != "Marché" {
                continue;
            }

            let rate = match parse_numeric(cell(rate_idx)) {
                Some(rate) if rate != 0.0 => rate,
                _ => {
                    log::warn!("skipping USD conversion: unusable exchange rate '{}'",
                        cell(rate_idx));
                    continue;
                }
            };

            let mut converted: Vec<String> = row.clone();
            converted.resize(headers.len(), String::new());
            converted[currency_idx] = "USD".to_string();
            for &idx in &meb_indices {
                converted[idx] = match parse_numeric(&converted[idx]) {
                    Some(value) => (value / rate).to_string(),
                    None => String::new(),
                };
            }
            converted_rows.push(converted);
        }
    }

    if !converted_rows.is_empty() {
        let usd_table = TableBuilder::from_raw_data(headers, converted_rows);
        table.append_table(&usd_table);
    }
}
