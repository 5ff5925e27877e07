// lib.rs
//! # MARKETTAB
//!
//! Cycle-over-cycle comparative pivot engine for market-monitoring dashboards. The
//! library loads long-format observation tables collected in discrete cycles, narrows
//! them by categorical selections, pivots them into product-by-geography (or
//! sector-by-geography) cross-tabs, compares consecutive cycles as percent
//! differences, and hands the rendering layer fully formatted, severity-tiered
//! structures, never markup.
//!
//! Every computation is synchronous, stateless, and pure over an immutable dataset
//! handle: a filter change recomputes the affected table from scratch, so concurrent
//! evaluation of independent pages is trivially safe.
//!
//! ## `table_utils`
//!
//! - **Purpose**: The long-format observation table every other module operates on.
//! - **Features**: A chainable `TableBuilder` covering:
//!   - **Easy Initialization**: Start empty, or load from CSV, XLSX, or XLS files.
//!   - **Ingestion Hygiene**: Trim cells, relabel values, validate required columns
//!     with descriptive fatal errors.
//!   - **Reshaping**: Melt wide value columns to long format, concatenate tables
//!     aligned on the union of their columns, derive new columns from existing rows.
//!   - **Narrowing**: Retain rows by trimmed-equality filters, drop rows with empty
//!     cells, retain or drop columns.
//!   - **Analysis Aids**: Distinct values, medians, means, multi-key sorting.
//!   - **Flexible Saving Options**: Save any table to a CSV path.
//!
//! ## `pivot_utils`
//!
//! - **Purpose**: The comparative pivot engine itself.
//! - **Features**:
//!   - `build_pivot`: filter one cycle, group by row and column dimensions,
//!     aggregate by median or mean, reshape into a rectangular cross-tab with the
//!     whole-country column and total row pinned last.
//!   - `build_difference`: outer-join the pivots of two consecutive cycles and
//!     compute percent changes, with the first cycle reported as a distinct
//!     no-prior-period condition rather than an empty result.
//!   - Explicit sentinels: an empty selection yields `Empty`, never an error and
//!     never a crashing blank table.
//!
//! ## `style_utils`
//!
//! - **Purpose**: Numeric-to-display policy for the rendering layer.
//! - **Features**:
//!   - Per-row quantile severity tiers over each row's own 25th/50th/75th
//!     percentiles.
//!   - Three-way sign classification of percent differences, with exactly-zero and
//!     undefined kept distinct.
//!   - Integer rounding with thousands separators, signed one-decimal percents, and
//!     JSON emission of every output structure.
//!
//! ## `load_utils`
//!
//! - **Purpose**: Cycle workbook ingestion and dataset preparation.
//! - **Features**:
//!   - Scan a data directory for per-cycle files by naming convention, inject the
//!     cycle column, and concatenate, aborting loudly when nothing matches.
//!   - Prepare the price dataset: derive product and currency dimensions, relabel
//!     the whole-evaluation geography, narrow to the default view.
//!   - Prepare the basket cost dataset: USD conversion rows, wide-to-long melt,
//!     sector mapping, basket flags.
//!   - `Dataset::load`: the explicit initialization step returning the immutable
//!     handle each page receives.
//!
//! ## `choice_utils`
//!
//! - **Purpose**: Selection lists for the dropdown and slider controls.
//! - **Features**: Sorted distinct options per dimension, cascaded options as pure
//!   functions of upstream selections, and cycle slider bounds from the periods
//!   actually present.
//!
//! ## `catalog_utils`
//!
//! - **Purpose**: The fixed reference list of basket items.
//! - **Features**: Full catalog access, filtering by crisis type and sector, and a
//!   display-table rendering of the filtered inventory.
//!
//! ## License
//!
//! This project is licensed under the MIT License.

pub mod catalog_utils;
pub mod choice_utils;
pub mod load_utils;
pub mod pivot_utils;
pub mod style_utils;
pub mod table_utils;
