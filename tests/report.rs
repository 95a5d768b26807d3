mod common;

use chrono::NaiveDate;
use rust_decimal::{Decimal, dec};
use sales_report::{
    DataError, InputError, RenderError, ReportOptions, SchemaError,
    aggregate::{MonthTotal, ProductTotal, summarize_by_month, summarize_by_product},
    columns::resolve_columns,
    compose::{ReportMetadata, format_amount},
    generate,
    input::{InputOptions, Scalar, load_table, resolve_encoding},
    normalize::normalize_rows,
};

use common::{TestWorkspace, assert_pdf, fixture_path};

fn month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

#[test]
fn quantity_and_price_rows_round_trip_into_summaries() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "sales.csv",
        "date,product,quantity,price\n2025-01-05,Camiseta,3,49.90\n2025-02-02,Camiseta,2,49.90\n",
    );
    let table = load_table(&input, &InputOptions::default()).unwrap();
    let columns = resolve_columns(&table.columns).unwrap();
    let rows = normalize_rows(&table, &columns).unwrap();

    assert_eq!(
        summarize_by_product(&rows).rows,
        vec![ProductTotal {
            product: "Camiseta".into(),
            sales: dec!(249.50),
        }]
    );
    assert_eq!(
        summarize_by_month(&rows).rows,
        vec![
            MonthTotal {
                month: month(2025, 1),
                sales: dec!(149.70),
            },
            MonthTotal {
                month: month(2025, 2),
                sales: dec!(99.80),
            },
        ]
    );
}

#[test]
fn sample_fixture_produces_a_pdf_report() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("report.pdf");
    let mut options = ReportOptions::new(fixture_path("sample_sales.csv"), &output);
    options.metadata = ReportMetadata::new("Relatório de Vendas", "Fonte: sample_sales.csv");

    let outcome = generate(&options).unwrap();
    assert_eq!(outcome.output, output);
    assert_eq!(outcome.rows, 10);
    assert_eq!(outcome.products, 5);
    assert_eq!(outcome.months, 5);
    assert_eq!(outcome.total_sales, dec!(2396.70));
    assert!(outcome.pages >= 1);
    assert_pdf(&workspace.read(&output));
}

#[test]
fn sample_fixture_aggregates_match_hand_totals() {
    let table = load_table(&fixture_path("sample_sales.csv"), &InputOptions::default()).unwrap();
    let columns = resolve_columns(&table.columns).unwrap();
    let rows = normalize_rows(&table, &columns).unwrap();

    let products: Vec<(String, String)> = summarize_by_product(&rows)
        .rows
        .into_iter()
        .map(|row| (row.product, format_amount(row.sales)))
        .collect();
    assert_eq!(
        products,
        vec![
            ("Tênis".to_string(), "1,199.60".to_string()),
            ("Camiseta".to_string(), "499.00".to_string()),
            ("Bermuda".to_string(), "479.40".to_string()),
            ("Boné".to_string(), "119.70".to_string()),
            ("Meia".to_string(), "99.00".to_string()),
        ]
    );

    let months: Vec<Decimal> = summarize_by_month(&rows)
        .rows
        .iter()
        .map(|row| row.sales)
        .collect();
    assert_eq!(
        months,
        vec![
            dec!(449.60),
            dec!(419.40),
            dec!(698.80),
            dec!(369.20),
            dec!(459.70)
        ]
    );
}

#[test]
fn portuguese_semicolon_file_in_legacy_encoding() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("vendas.pdf");
    let mut options = ReportOptions::new(fixture_path("vendas_pt.csv"), &output);
    options.input_options = InputOptions {
        delimiter: Some(b';'),
        encoding: resolve_encoding(Some("windows-1252")).unwrap(),
        sheet: None,
    };

    let outcome = generate(&options).unwrap();
    assert_eq!(outcome.products, 5);
    assert_eq!(outcome.months, 5);
    assert_eq!(outcome.total_sales, dec!(2396.70));
    assert_pdf(&workspace.read(&output));
}

#[test]
fn workbook_fixture_reads_excel_dates() {
    let table = load_table(&fixture_path("sample_sales.xlsx"), &InputOptions::default()).unwrap();
    assert_eq!(table.columns, vec!["date", "product", "quantity", "price"]);
    assert_eq!(
        table.rows[0].get(0),
        &Scalar::Date(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap())
    );
    let columns = resolve_columns(&table.columns).unwrap();
    let rows = normalize_rows(&table, &columns).unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    assert_eq!(rows[0].product, "Camiseta");

    let products = summarize_by_product(&rows);
    assert_eq!(products.rows[0].product, "Tênis");
    assert_eq!(format_amount(products.total_sales()), "2,396.70");
    assert_eq!(summarize_by_month(&rows).len(), 5);
}

#[test]
fn workbook_sheet_selection() {
    let path = fixture_path("sample_sales.xlsx");
    let named = InputOptions {
        sheet: Some("Vendas".into()),
        ..InputOptions::default()
    };
    assert_eq!(load_table(&path, &named).unwrap().row_count(), 10);

    let missing = InputOptions {
        sheet: Some("Compras".into()),
        ..InputOptions::default()
    };
    match load_table(&path, &missing) {
        Err(InputError::MissingSheet { available, .. }) => {
            assert_eq!(available, vec!["Vendas".to_string()]);
        }
        other => panic!("expected missing sheet error, got {other:?}"),
    }
}

#[test]
fn missing_date_column_is_a_schema_error_and_writes_nothing() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", "when,product,sales\n2025-01-05,Meia,10\n");
    let output = workspace.file("report.pdf");

    let err = generate(&ReportOptions::new(&input, &output)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchemaError>(),
        Some(SchemaError::MissingDateColumn { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn unparsable_date_is_a_data_error() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "sales.csv",
        "date,product,sales\n2025-01-05,Meia,10\nontem,Meia,5\n",
    );
    let output = workspace.file("report.pdf");

    let err = generate(&ReportOptions::new(&input, &output)).unwrap_err();
    let data_error = err.downcast_ref::<DataError>().expect("data error");
    assert_eq!(data_error.row, 3);
    assert_eq!(data_error.value, "ontem");
    assert!(!output.exists());
}

#[test]
fn unparsable_sales_values_count_as_zero() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "sales.csv",
        "date,product,quantity,price\n2025-01-05,Meia,2,9.90\n2025-01-06,Boné,dois,39.90\n",
    );
    let output = workspace.file("report.pdf");

    let outcome = generate(&ReportOptions::new(&input, &output)).unwrap();
    assert_eq!(outcome.rows, 2);
    assert_eq!(outcome.products, 2);
    assert_eq!(outcome.total_sales, dec!(19.80));
}

#[test]
fn unwritable_output_is_a_render_error() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("no-such-dir").join("report.pdf");
    let options = ReportOptions::new(fixture_path("sample_sales.csv"), &output);

    let err = generate(&options).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RenderError>(),
        Some(RenderError::Write { .. })
    ));
}

#[test]
fn existing_output_is_overwritten() {
    let workspace = TestWorkspace::new();
    let output = workspace.write("report.pdf", "stale contents");
    generate(&ReportOptions::new(fixture_path("sample_sales.csv"), &output)).unwrap();
    assert_pdf(&workspace.read(&output));
}

#[test]
fn missing_input_is_an_input_error() {
    let workspace = TestWorkspace::new();
    let options = ReportOptions::new(workspace.file("absent.csv"), workspace.file("out.pdf"));
    let err = generate(&options).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<InputError>(),
        Some(InputError::Open { .. })
    ));
}
