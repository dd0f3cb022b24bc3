/// Rock-derivative layer: elemental reference tables and the closed-form
/// photosphere-enrichment model.
///
/// `table` joins the three reference CSVs (solar photosphere, atomic
/// weights, bulk Earth) into one [`table::AbundanceTable`] keyed by element
/// symbol; `model` evaluates the abundance-enrichment function and its
/// derivatives over that table.
pub mod model;
pub mod table;
