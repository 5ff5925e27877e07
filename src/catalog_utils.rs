// catalog_utils.rs
use crate::table_utils::TableBuilder;
use lazy_static::lazy_static;
use serde::Serialize;

/// Label of the prolonged-crisis basket.
pub const CRISIS_PROLONGED: &str = "MEB crise prolongée";
/// Label of the emergency basket.
pub const CRISIS_EMERGENCY: &str = "MEB crise d'urgence";

/// One reference basket item: the article tracked, its unit, the quantities retained
/// for a five-person household, and the purchase frequency. Quantities are absent for
/// lump-sum expenditure lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub crisis_type: &'static str,
    pub sector: &'static str,
    pub article: &'static str,
    pub unit: &'static str,
    pub qty_household: Option<f64>,
    pub qty_month: Option<f64>,
    pub frequency: &'static str,
}

fn item(
    crisis_type: &'static str,
    sector: &'static str,
    article: &'static str,
    unit: &'static str,
    qty_household: Option<f64>,
    qty_month: Option<f64>,
    frequency: &'static str,
) -> CatalogItem {
    CatalogItem {
        crisis_type,
        sector,
        article,
        unit,
        qty_household,
        qty_month,
        frequency,
    }
}

lazy_static! {
    /// The fixed reference list of basket items, both crisis types.
    static ref CATALOG: Vec<CatalogItem> = {
        let mut items = Vec::new();
        let prolonged = CRISIS_PROLONGED;
        let emergency = CRISIS_EMERGENCY;

        // Prolonged crisis: ABNA
        items.push(item(prolonged, "ABNA", "Marmite - acier inoxydable", "Pièce 7L", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Poêle à frire", "Pièce 2.5L", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Marmite avec couvercle", "Pièce 5L", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Bol métallique", "Pièce 1L", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Assiette métallique", "Pièce 0.75L", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Gobelet métallique", "Pièce 0.3L", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Cuillère à soupe en acier inoxydable", "Pièce 10 mL", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Cuillère en bois à mélanger 30 cm", "Pièce 30 cm", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Fourchette de table acier inoxydable", "Pièce 17 cm", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Couteau de table acier inoxydable", "Pièce 17 cm", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Couteau de cuisine, lame en acier inoxydable", "Pièce 15 cm", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Tampon à récurer/paille de fer", "Pièce", Some(1.0), Some(1.0), "Mensuelle"));
        items.push(item(prolonged, "ABNA", "Couverture 50% laine", "Pièce 1.5x2m", Some(3.0), Some(0.3), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Matelas", "Pièce", Some(2.0), Some(0.2), "Ponctuelle"));
        items.push(item(prolonged, "ABNA", "Combustible - charbon de bois", "Gros sac 18Lb", Some(1.0), Some(1.0), "Mensuelle"));
        items.push(item(prolonged, "ABNA", "Combustible - gaz propane", "Litre", Some(9.0), Some(9.0), "Mensuelle"));
        items.push(item(prolonged, "ABNA", "Rechaud de 3 pièces (à charbon)", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));

        // Prolonged crisis: WASH
        items.push(item(prolonged, "WASH", "Grande bassine", "Pièce", Some(3.0), Some(0.3), "Ponctuelle"));
        items.push(item(prolonged, "WASH", "Cuvette", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "WASH", "Eau potable (l)", "litres", Some(750.0), Some(750.0), "Mensuelle"));
        items.push(item(prolonged, "WASH", "Savon lessive", "Kg", Some(1.0), Some(1.0), "Mensuelle"));
        items.push(item(prolonged, "WASH", "Brosse à dents", "Pièce", Some(5.0), Some(5.0), "Mensuelle"));
        items.push(item(prolonged, "WASH", "Dentifrice", "Pièce (85 gr)", Some(4.0), Some(4.0), "Mensuelle"));
        items.push(item(prolonged, "WASH", "Papier toilette", "Pièce", Some(5.0), Some(5.0), "Mensuelle"));
        items.push(item(prolonged, "WASH", "Serviettes hygiéniques", "Paquet (8)", Some(3.0), Some(3.0), "Mensuelle"));
        items.push(item(prolonged, "WASH", "Savon bain (75 Gr)", "Pièce", Some(13.0), Some(13.0), "Mensuelle"));
        items.push(item(prolonged, "WASH", "Bassine pour faire la lessive", "Piece", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "WASH", "Deodorant", "Flacon", Some(3.0), Some(3.0), "Mensuelle"));

        // Prolonged crisis: Protection
        items.push(item(prolonged, "Protection", "Torche (y compris piles ou batteries)", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "Protection", "Carte sim", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "Protection", "Téléphone", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(prolonged, "Protection", "Recharge de telephone de 100 HTG", "Personne", Some(3.0), Some(3.0), "Mensuelle"));

        // Prolonged crisis: Education
        items.push(item(prolonged, "Education", "Dépenses moyennes (basé sur les dépenses moyennes des ménages)", "Forfait en HTG", None, None, "Mensuelle"));

        // Prolonged crisis: Santé
        items.push(item(prolonged, "Santé", "Moustiquaire double", "Pièce", Some(2.0), Some(0.2), "Ponctuelle"));
        items.push(item(prolonged, "Santé", "Dépenses moyennes (basé sur les dépenses moyennes des ménages)", "Forfait en HTG", None, None, "Mensuelle"));

        // Emergency: ABNA
        items.push(item(emergency, "ABNA", "Marmite - acier inoxydable", "Pièce 7L", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Bol métallique", "Pièce 1L", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Gobelet métallique", "Pièce 0.3L", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Cuillère à soupe en acier inoxydable", "Pièce 10 mL", Some(5.0), Some(0.4), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Cuillère en bois à mélanger 30 cm", "Pièce 30 cm", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Couteau de cuisine, lame en acier inoxydable", "Pièce 15 cm", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Tampon à récurer/paille de fer", "Pièce", Some(1.0), Some(1.0), "Mensuelle"));
        items.push(item(emergency, "ABNA", "Couverture 50% laine", "Pièce 1.5x2m", Some(3.0), Some(0.3), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Natte", "Pièce", Some(2.0), Some(0.2), "Ponctuelle"));
        items.push(item(emergency, "ABNA", "Combustible - charbon de bois", "Gros sac 18Lb", Some(1.0), Some(1.0), "Mensuelle"));
        items.push(item(emergency, "ABNA", "Rechaud de 3 pièces (à charbon)", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));

        // Emergency: ABNA Shelter
        items.push(item(emergency, "ABNA Shelter", "Corde Polypropylène, 6 mm diamètre rouleaux torsadés", "m", Some(60.0), Some(5.0), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "2” clou (50mm)", "kg", Some(2.0), Some(0.2), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "3” clou (75mm)", "kg", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "2.5” clou pour toiture (63mm)", "kg", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "Fil de ligature", "m", Some(100.0), Some(8.3), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "Marteau", "Pièce", Some(2.0), Some(0.2), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "Pelle", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "Sécateur", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "Houe", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "ABNA Shelter", "Pioche", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));

        // Emergency: WASH
        items.push(item(emergency, "WASH", "Grande bassine", "Pièce", Some(3.0), Some(0.3), "Ponctuelle"));
        items.push(item(emergency, "WASH", "Eau potable (l)", "(litres)", Some(750.0), Some(750.0), "Mensuelle"));
        items.push(item(emergency, "WASH", "Savon lessive", "Kg", Some(1.0), Some(1.0), "Mensuelle"));
        items.push(item(emergency, "WASH", "Brosse à dents", "Pièce", Some(5.0), Some(5.0), "Mensuelle"));
        items.push(item(emergency, "WASH", "Dentifrice", "Pièce (85 gr)", Some(4.0), Some(4.0), "Mensuelle"));
        items.push(item(emergency, "WASH", "Papier toilette", "Pièce", Some(5.0), Some(5.0), "Mensuelle"));
        items.push(item(emergency, "WASH", "Serviettes hygiéniques", "Paquet (8)", Some(3.0), Some(3.0), "Mensuelle"));
        items.push(item(emergency, "WASH", "Savon bain (75 Gr)", "Pièce", Some(13.0), Some(13.0), "Mensuelle"));

        // Emergency: Protection
        items.push(item(emergency, "Protection", "Torche (y compris piles ou batteries)", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "Protection", "Carte sim", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "Protection", "Téléphone", "Pièce", Some(1.0), Some(0.1), "Ponctuelle"));
        items.push(item(emergency, "Protection", "Recharge de telephone de 100 HTG", "Personne", Some(3.0), Some(3.0), "Mensuelle"));

        // Emergency: Education
        items.push(item(emergency, "Education", "Dépenses moyennes (basé sur les dépenses moyennes des ménages)", "Forfait en HTG", None, None, "Mensuelle"));

        // Emergency: Santé
        items.push(item(emergency, "Santé", "Moustiquaire double", "Pièce", Some(2.0), Some(0.2), "Ponctuelle"));
        items.push(item(emergency, "Santé", "Dépenses moyennes (basé sur les dépenses moyennes des ménages)", "Forfait en HTG", None, None, "Mensuelle"));

        items
    };
}

/// Returns the full reference catalog.
pub fn catalog() -> &'static [CatalogItem] {
    &CATALOG
}

/// Returns the catalog items for one crisis type and sector.
///
/// ```
/// use markettab::catalog_utils::{filter_catalog, CRISIS_EMERGENCY};
///
/// let items = filter_catalog(CRISIS_EMERGENCY, "Protection");
/// assert_eq!(items.len(), 4);
/// assert!(items.iter().all(|i| i.sector == "Protection"));
/// ```
pub fn filter_catalog(crisis_type: &str, sector: &str) -> Vec<&'static CatalogItem> {
    CATALOG
        .iter()
        .filter(|item| item.crisis_type == crisis_type.trim() && item.sector == sector.trim())
        .collect()
}

/// Returns the crisis-type options offered by the catalog.
pub fn crisis_type_choices() -> Vec<String> {
    let mut choices: Vec<String> = CATALOG
        .iter()
        .map(|item| item.crisis_type.to_string())
        .collect();
    choices.sort();
    choices.dedup();
    choices
}

/// Returns the sector options of one crisis type.
pub fn sector_choices(crisis_type: &str) -> Vec<String> {
    let mut choices: Vec<String> = CATALOG
        .iter()
        .filter(|item| item.crisis_type == crisis_type.trim())
        .map(|item| item.sector.to_string())
        .collect();
    choices.sort();
    choices.dedup();
    choices
}

/// Renders the filtered catalog as a display table, one row per article.
pub fn catalog_table(crisis_type: &str, sector: &str) -> TableBuilder {
    let mut table = TableBuilder::new();
    table.set_header(vec![
        "Articles",
        "Unités",
        "Quantité pour menage 5 personnes",
        "Quantités/ménage/mois",
        "Fréquence",
    ]);

    for entry in filter_catalog(crisis_type, sector) {
        let qty_household = entry
            .qty_household
            .map(|q| q.to_string())
            .unwrap_or_default();
        let qty_month = entry.qty_month.map(|q| q.to_string()).unwrap_or_default();
        table.add_row(vec![
            entry.article,
            entry.unit,
            &qty_household,
            &qty_month,
            entry.frequency,
        ]);
    }

    table
}
