//! Integration tests for cycle workbook ingestion and dataset preparation, driven
//! through on-disk CSV fixtures.

use markettab::choice_utils::{choices, cycle_bounds, cycle_choices, dependent_choices};
use markettab::load_utils::{
    list_cycle_files, load_cycle_tables, prepare_price_tables, Dataset, CYCLE_COLUMN,
    MEB_FILE_SUFFIX, PRICE_FILE_SUFFIX, WHOLE_COUNTRY,
};
use markettab::pivot_utils::{
    build_pivot, Aggregator, CycleId, PivotOutcome, PivotSpec,
};
use markettab::table_utils::TableBuilder;
use std::path::Path;
use tempfile::TempDir;

const PRICE_HEADER: [&str; 6] = [
    "question_variable_label",
    "Filtre",
    "Sujet",
    "Sector",
    "Disag",
    "Value",
];

fn write_csv(dir: &Path, file_name: &str, header: &[&str], rows: &[Vec<&str>]) {
    let path = dir.join(file_name);
    let mut writer = csv::Writer::from_path(&path).expect("failed to create CSV writer");
    writer.write_record(header).expect("failed to write header");
    for row in rows {
        writer.write_record(row).expect("failed to write row");
    }
    writer.flush().expect("failed to flush writer");
}

fn write_price_fixtures(dir: &Path) {
    write_csv(
        dir,
        "cycle_1_ICSM_analyse.csv",
        &PRICE_HEADER,
        &[
            vec!["Savon", "Toute l'evaluation", "Prix median", "WASH", "Nord", "100"],
            vec!["Savon", "Toute l'evaluation", "Prix median", "WASH", "Sud", "200"],
            vec!["Savon (usd)", "Toute l'evaluation", "Prix median", "WASH", "Nord", "0.8"],
            vec!["Riz", "Toute l'evaluation", "Prix moyen", "Alimentaire", "Nord", "310"],
        ],
    );
    write_csv(
        dir,
        "cycle_2_ICSM_analyse.csv",
        &PRICE_HEADER,
        &[
            vec!["Savon", "Toute l'evaluation", "Prix median", "WASH", "Nord", "150"],
            vec!["Savon", "Toute l'evaluation", "Prix median", "WASH", "Sud", "180"],
        ],
    );
}

const MEB_HEADER: [&str; 9] = [
    "currency",
    "zone",
    "Type_meb",
    "meb_par",
    "USD_official",
    "MEB_soap",
    "MEB_WASH_basket",
    "MEB_abna_basket",
    "MEB_total",
];

fn write_meb_fixtures(dir: &Path) {
    write_csv(
        dir,
        "cycle_1_MEB_analyse.csv",
        &MEB_HEADER,
        &[
            vec!["HTG", "Nord", "Urgence", "Marché", "100", "50", "500", "700", "1200"],
            vec!["HTG", "pays", "Urgence", "Marché", "100", "60", "550", "750", "1300"],
        ],
    );
    write_csv(
        dir,
        "cycle_2_MEB_analyse.csv",
        &MEB_HEADER,
        &[
            vec!["HTG", "Nord", "Urgence", "Marché", "100", "55", "520", "710", "1250"],
            vec!["HTG", "pays", "Urgence", "Marché", "100", "62", "560", "760", "1320"],
        ],
    );
}

#[test]
fn test_load_cycle_tables_merges_cycles_with_injected_period() {
    let dir = TempDir::new().unwrap();
    write_price_fixtures(dir.path());

    let merged = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX).unwrap();

    assert!(merged.column_index(CYCLE_COLUMN).is_some());
    assert_eq!(merged.get_data().unwrap().len(), 6);
    assert_eq!(
        merged.get_unique(CYCLE_COLUMN),
        vec!["cycle_1".to_string(), "cycle_2".to_string()]
    );
}

#[test]
fn test_missing_files_abort_with_descriptive_error() {
    let dir = TempDir::new().unwrap();

    let result = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX);

    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains(PRICE_FILE_SUFFIX), "got: {}", message);
}

#[test]
fn test_files_with_invalid_cycle_stem_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_price_fixtures(dir.path());
    write_csv(
        dir.path(),
        "draft_ICSM_analyse.csv",
        &PRICE_HEADER,
        &[vec!["Savon", "Nord", "Prix median", "WASH", "Nord", "1"]],
    );

    let merged = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX).unwrap();

    // Only the two valid cycle files contribute rows.
    assert_eq!(merged.get_data().unwrap().len(), 6);
}

#[test]
fn test_only_invalid_stems_count_as_no_files() {
    let dir = TempDir::new().unwrap();
    write_csv(
        dir.path(),
        "draft_ICSM_analyse.csv",
        &PRICE_HEADER,
        &[vec!["Savon", "Nord", "Prix median", "WASH", "Nord", "1"]],
    );

    let result = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX);
    assert!(result.is_err());
}

#[test]
fn test_missing_required_column_aborts_naming_the_column() {
    let dir = TempDir::new().unwrap();
    write_csv(
        dir.path(),
        "cycle_1_ICSM_analyse.csv",
        &["question_variable_label", "Filtre", "Sujet", "Sector", "Value"],
        &[vec!["Savon", "Nord", "Prix median", "WASH", "100"]],
    );

    let raw = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX).unwrap();
    let result = prepare_price_tables(&raw);

    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("Disag"), "got: {}", message);
}

#[test]
fn test_prepare_price_tables_derives_dimensions_and_narrows_the_view() {
    let dir = TempDir::new().unwrap();
    write_price_fixtures(dir.path());

    let raw = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX).unwrap();
    let (full, filtered) = prepare_price_tables(&raw).unwrap();

    assert_eq!(
        choices(&full, "currency"),
        vec!["HTG".to_string(), "USD".to_string()]
    );
    assert_eq!(choices(&full, "Filtre"), vec![WHOLE_COUNTRY.to_string()]);

    // The default view keeps median prices in gourdes only.
    assert_eq!(filtered.get_data().unwrap().len(), 4);
    assert_eq!(choices(&filtered, "Sujet"), vec!["Prix median".to_string()]);
    assert_eq!(choices(&filtered, "Produit"), vec!["Savon".to_string()]);
}

#[test]
fn test_loaded_dataset_drives_the_pivot_engine() {
    let dir = TempDir::new().unwrap();
    write_price_fixtures(dir.path());
    write_meb_fixtures(dir.path());

    let dataset = Dataset::load(dir.path().to_str().unwrap()).unwrap();

    let spec = PivotSpec {
        cycle: CycleId::new(2),
        cycle_column: CYCLE_COLUMN.to_string(),
        filters: vec![
            ("Sector".to_string(), "WASH".to_string()),
            ("Filtre".to_string(), WHOLE_COUNTRY.to_string()),
        ],
        row_dim: "Produit".to_string(),
        col_dim: "Disag".to_string(),
        value_column: "Value".to_string(),
        aggregator: Aggregator::Median,
        aggregate_label: Some(WHOLE_COUNTRY.to_string()),
        total_label: None,
    };

    match build_pivot(&dataset.prices_filtered, &spec).unwrap() {
        PivotOutcome::Table(pivot) => {
            assert_eq!(pivot.rows, vec!["Savon"]);
            assert_eq!(pivot.value("Savon", "Nord"), Some(150.0));
            assert_eq!(pivot.value("Savon", "Sud"), Some(180.0));
        }
        PivotOutcome::Empty => panic!("expected price pivot to hold data"),
    }
}

#[test]
fn test_choice_lists_cascade_from_the_dataset() {
    let dir = TempDir::new().unwrap();
    write_price_fixtures(dir.path());

    let raw = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX).unwrap();
    let (full, filtered) = prepare_price_tables(&raw).unwrap();

    assert_eq!(cycle_bounds(&filtered, CYCLE_COLUMN), Some((1, 2)));
    let cycle_labels: Vec<String> = cycle_choices(&filtered, CYCLE_COLUMN)
        .iter()
        .map(|cycle| cycle.label())
        .collect();
    assert_eq!(cycle_labels, vec!["cycle_1".to_string(), "cycle_2".to_string()]);
    assert_eq!(
        choices(&full, "Sector"),
        vec!["Alimentaire".to_string(), "WASH".to_string()]
    );
    assert_eq!(
        dependent_choices(&full, "Produit", &[("Sector", "Alimentaire")]),
        vec!["Riz".to_string()]
    );
}

#[test]
fn test_list_cycle_files_reports_the_matching_files() {
    let dir = TempDir::new().unwrap();
    write_price_fixtures(dir.path());
    write_csv(dir.path(), "unrelated.csv", &["a"], &[vec!["1"]]);

    let listing = list_cycle_files(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX).unwrap();

    let names: Vec<String> = listing
        .get_data()
        .unwrap()
        .iter()
        .map(|row| row[0].clone())
        .collect();
    assert_eq!(
        names,
        vec![
            "cycle_1_ICSM_analyse.csv".to_string(),
            "cycle_2_ICSM_analyse.csv".to_string()
        ]
    );
}

#[test]
fn test_save_as_round_trips_through_csv() {
    let dir = TempDir::new().unwrap();
    write_price_fixtures(dir.path());

    let raw = load_cycle_tables(dir.path().to_str().unwrap(), PRICE_FILE_SUFFIX).unwrap();
    let (_, mut filtered) = prepare_price_tables(&raw).unwrap();

    let out_path = dir.path().join("filtered.csv");
    filtered.save_as(out_path.to_str().unwrap()).unwrap();

    let reloaded = TableBuilder::from_csv(out_path.to_str().unwrap());
    assert_eq!(reloaded.get_headers(), filtered.get_headers());
    assert_eq!(reloaded.get_data(), filtered.get_data());
}
