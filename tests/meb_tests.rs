//! Integration tests for basket cost preparation: USD conversion, the wide-to-long
//! melt, sector mapping, and the sector cost pivot.

use markettab::catalog_utils::{
    catalog, catalog_table, crisis_type_choices, filter_catalog, sector_choices,
    CRISIS_EMERGENCY, CRISIS_PROLONGED,
};
use markettab::choice_utils::choices;
use markettab::load_utils::{
    prepare_meb_table, CYCLE_COLUMN, TOTAL_LABEL, WHOLE_COUNTRY,
};
use markettab::pivot_utils::{
    build_difference, build_pivot, Aggregator, CycleId, DiffOutcome, PivotOutcome, PivotSpec,
};
use markettab::table_utils::TableBuilder;

fn meb_headers() -> Vec<String> {
    vec![
        "currency".to_string(),
        "zone".to_string(),
        "Type_meb".to_string(),
        "meb_par".to_string(),
        "USD_official".to_string(),
        "MEB_soap".to_string(),
        "MEB_WASH_basket".to_string(),
        "MEB_abna_basket".to_string(),
        "MEB_total".to_string(),
        CYCLE_COLUMN.to_string(),
    ]
}

fn raw_meb_table() -> TableBuilder {
    let rows = vec![
        vec!["HTG", "Nord", "Urgence", "Marché", "100", "50", "500", "700", "1200", "cycle_1"],
        vec!["HTG", "pays", "Urgence", "Marché", "100", "60", "550", "750", "1300", "cycle_1"],
        vec!["HTG", "Nord", "Crise prolongée", "Marché", "100", "55", "520", "720", "1240", "cycle_1"],
        // No computation basis: dropped during preparation.
        vec!["HTG", "Nord", "Urgence", "", "100", "1", "1", "1", "1", "cycle_1"],
        vec!["HTG", "Nord", "Urgence", "Marché", "100", "55", "520", "710", "1250", "cycle_2"],
        vec!["HTG", "pays", "Urgence", "Marché", "100", "62", "560", "760", "1320", "cycle_2"],
    ];
    TableBuilder::from_raw_data(
        meb_headers(),
        rows.into_iter()
            .map(|row| row.into_iter().map(String::from).collect())
            .collect(),
    )
}

fn meb_spec(cycle: u32, currency: &str) -> PivotSpec {
    PivotSpec {
        cycle: CycleId::new(cycle),
        cycle_column: CYCLE_COLUMN.to_string(),
        filters: vec![
            ("Type_meb".to_string(), CRISIS_EMERGENCY.to_string()),
            ("meb_par".to_string(), "Marché".to_string()),
            ("currency".to_string(), currency.to_string()),
            ("is_basket".to_string(), "true".to_string()),
        ],
        row_dim: "sector".to_string(),
        col_dim: "zone".to_string(),
        value_column: "Value".to_string(),
        aggregator: Aggregator::Mean,
        aggregate_label: Some(WHOLE_COUNTRY.to_string()),
        total_label: Some(TOTAL_LABEL.to_string()),
    }
}

#[test]
fn test_prepare_meb_table_melts_and_maps_sectors() {
    let long = prepare_meb_table(&raw_meb_table()).unwrap();

    assert_eq!(
        long.get_headers().unwrap(),
        &[
            "currency".to_string(),
            "zone".to_string(),
            "Type_meb".to_string(),
            "meb_par".to_string(),
            CYCLE_COLUMN.to_string(),
            "Product".to_string(),
            "Value".to_string(),
            "sector".to_string(),
            "is_basket".to_string(),
            "is_total".to_string(),
        ]
    );

    // 5 kept wide rows + 4 USD copies of the emergency market rows, times 4 value
    // columns each.
    assert_eq!(long.get_data().unwrap().len(), 36);

    assert_eq!(
        choices(&long, "sector"),
        vec![
            "ABNA".to_string(),
            "Total".to_string(),
            "WASH".to_string()
        ]
    );
    assert_eq!(
        choices(&long, "Type_meb"),
        vec![CRISIS_EMERGENCY.to_string(), CRISIS_PROLONGED.to_string()]
    );
    assert_eq!(
        choices(&long, "zone"),
        vec!["Nord".to_string(), WHOLE_COUNTRY.to_string()]
    );
}

#[test]
fn test_usd_conversion_rows_divide_by_the_official_rate() {
    let long = prepare_meb_table(&raw_meb_table()).unwrap();

    let spec = meb_spec(1, "USD");
    match build_pivot(&long, &spec).unwrap() {
        PivotOutcome::Table(pivot) => {
            assert_eq!(pivot.value("WASH", "Nord"), Some(5.0));
            assert_eq!(pivot.value(TOTAL_LABEL, "Nord"), Some(12.0));
            assert_eq!(pivot.value(TOTAL_LABEL, WHOLE_COUNTRY), Some(13.0));
        }
        PivotOutcome::Empty => panic!("expected USD basket rows after conversion"),
    }
}

#[test]
fn test_sector_pivot_pins_total_row_and_country_column_last() {
    let long = prepare_meb_table(&raw_meb_table()).unwrap();

    let spec = meb_spec(1, "HTG");
    match build_pivot(&long, &spec).unwrap() {
        PivotOutcome::Table(pivot) => {
            assert_eq!(
                pivot.rows,
                vec!["ABNA".to_string(), "WASH".to_string(), TOTAL_LABEL.to_string()]
            );
            assert_eq!(
                pivot.columns,
                vec!["Nord".to_string(), WHOLE_COUNTRY.to_string()]
            );
            assert_eq!(pivot.value("WASH", "Nord"), Some(500.0));
            assert_eq!(pivot.value("ABNA", WHOLE_COUNTRY), Some(750.0));
            assert_eq!(pivot.value(TOTAL_LABEL, "Nord"), Some(1200.0));
        }
        PivotOutcome::Empty => panic!("expected basket rows for the emergency crisis"),
    }
}

#[test]
fn test_sector_difference_between_cycles() {
    let long = prepare_meb_table(&raw_meb_table()).unwrap();

    let spec = meb_spec(2, "HTG");
    match build_difference(&long, &spec).unwrap() {
        DiffOutcome::Table(diff) => {
            let wash = diff.value("WASH", "Nord").unwrap();
            let expected = (520.0 - 500.0) / 500.0 * 100.0;
            assert!((wash - expected).abs() < 1e-9);

            let total = diff.value(TOTAL_LABEL, WHOLE_COUNTRY).unwrap();
            let expected = (1320.0 - 1300.0) / 1300.0 * 100.0;
            assert!((total - expected).abs() < 1e-9);
        }
        other => panic!("expected a difference table, got {:?}", other),
    }
}

#[test]
fn test_rows_without_computation_basis_are_dropped() {
    let long = prepare_meb_table(&raw_meb_table()).unwrap();

    // The row with an empty meb_par must not contribute any observation.
    let mut probe = long.from_copy();
    probe.where_eq(vec![("meb_par", "")]);
    assert!(!probe.has_data());
}

#[test]
fn test_missing_meb_columns_abort() {
    let table = TableBuilder::from_raw_data(
        vec![
            "currency".to_string(),
            "zone".to_string(),
            "Type_meb".to_string(),
            "meb_par".to_string(),
            "USD_official".to_string(),
            CYCLE_COLUMN.to_string(),
        ],
        vec![vec![
            "HTG".to_string(),
            "Nord".to_string(),
            "Urgence".to_string(),
            "Marché".to_string(),
            "100".to_string(),
            "cycle_1".to_string(),
        ]],
    );

    let result = prepare_meb_table(&table);
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("MEB_"), "got: {}", message);
}

#[test]
fn test_catalog_filters_by_crisis_type_and_sector() {
    assert!(!catalog().is_empty());
    assert_eq!(
        crisis_type_choices(),
        vec![CRISIS_EMERGENCY.to_string(), CRISIS_PROLONGED.to_string()]
    );

    let emergency_sectors = sector_choices(CRISIS_EMERGENCY);
    assert!(emergency_sectors.contains(&"ABNA Shelter".to_string()));
    // The shelter kit only belongs to the emergency basket.
    assert!(!sector_choices(CRISIS_PROLONGED).contains(&"ABNA Shelter".to_string()));

    let items = filter_catalog(CRISIS_EMERGENCY, "Protection");
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|i| i.crisis_type == CRISIS_EMERGENCY));

    let lump_sum = filter_catalog(CRISIS_PROLONGED, "Education");
    assert_eq!(lump_sum.len(), 1);
    assert_eq!(lump_sum[0].qty_household, None);

    let table = catalog_table(CRISIS_EMERGENCY, "Protection");
    assert_eq!(table.get_headers().unwrap()[0], "Articles");
    assert_eq!(table.get_data().unwrap().len(), 4);
    // Lump-sum lines render blank quantities.
    let education = catalog_table(CRISIS_PROLONGED, "Education");
    assert_eq!(education.get_data().unwrap()[0][2], "");
}
