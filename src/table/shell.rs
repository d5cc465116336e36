//! Initial page for the attendance table.
//!
//! The page only carries the table skeleton and its client configuration;
//! rows arrive through follow-up data requests to the same URL.

use once_cell::sync::Lazy;
use serde_json::{Value, json};
use tera::{Context, Tera};

use super::columns::{COLUMNS, ColumnDescription, DEFAULT_ORDER};
use crate::error::AppError;

/// `[[10, 25, 50, -1], [labels]]`, -1 being "all rows".
const LENGTH_MENU: [i64; 4] = [10, 25, 50, -1];
const EXPORT_BUTTONS: [&str; 5] = ["copy", "csv", "excel", "pdf", "print"];

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{{ title }}</title>
</head>
<body>
<div class="card">
    <div class="card-header"><h3 class="card-title">{{ title }}</h3></div>
    <div class="card-body">
        <form id="date_filter" class="form-inline" onsubmit="return false;">
            <label for="dateFrom">From</label>
            <input type="date" id="dateFrom" name="dateFrom" class="form-control">
            <label for="dateTo">To</label>
            <input type="date" id="dateTo" name="dateTo" class="form-control">
            <button type="button" id="date_filter_apply" class="btn btn-primary">Filter</button>
        </form>
        <table id="{{ table_id }}" class="table table-bordered table-striped" style="width:100%">
            <thead>
            <tr>{% for c in columns %}<th>{{ c.title }}</th>{% endfor %}</tr>
            </thead>
        </table>
    </div>
</div>
<script>
(function (window, $) {
    var columns = {{ columns_json | safe }};
    var parameters = {{ parameters_json | safe }};
    var table = $("#{{ table_id }}").DataTable($.extend({
        serverSide: true,
        processing: true,
        ajax: {
            url: {{ ajax_url_json | safe }},
            type: "GET",
            data: function (data) {
                var formData = $("#date_filter").find("input").serializeArray();
                $.each(formData, function (i, obj) {
                    data[obj.name] = obj.value;
                });
            }
        },
        columns: columns
    }, parameters));
    $("#date_filter_apply").on("click", function () {
        table.draw();
    });
})(window, window.jQuery);
</script>
</body>
</html>
"##;

const TEMPLATE_NAME: &str = "attendance/index.html";

static TEMPLATES: Lazy<Result<Tera, tera::Error>> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, PAGE_TEMPLATE)?;
    Ok(tera)
});

/// Client parameters: default order, paging menu and export buttons.
pub fn table_parameters() -> Value {
    let order: Vec<Value> = DEFAULT_ORDER.iter().map(|i| json!([i, "desc"])).collect();
    let labels: Vec<String> = LENGTH_MENU
        .iter()
        .map(|n| match n {
            -1 => "Show all".to_string(),
            n => format!("{} rows", n),
        })
        .collect();
    let exported: Vec<usize> = (0..COLUMNS.len()).collect();
    let buttons: Vec<Value> = EXPORT_BUTTONS
        .iter()
        .map(|b| json!({ "extend": b, "exportOptions": { "columns": exported } }))
        .collect();

    json!({
        "order": order,
        "responsive": true,
        "autoWidth": false,
        "lengthMenu": [LENGTH_MENU, labels],
        "dom": "Bfrtip",
        "buttons": buttons,
    })
}

/// JSON safe to inline in a `<script>` block.
fn script_json(value: &impl serde::Serialize) -> Result<String, AppError> {
    let raw = serde_json::to_string(value).map_err(|e| AppError::Render(e.to_string()))?;
    Ok(raw.replace("</", "<\\/"))
}

pub fn render_page(ajax_url: &str) -> Result<String, AppError> {
    let columns: Vec<ColumnDescription> = COLUMNS.iter().map(ColumnDescription::from).collect();

    let mut context = Context::new();
    context.insert("title", "Attendances");
    context.insert("table_id", "attendance-table");
    context.insert("ajax_url_json", &script_json(&ajax_url)?);
    context.insert("columns", &columns);
    context.insert("columns_json", &script_json(&columns)?);
    context.insert("parameters_json", &script_json(&table_parameters())?);

    let tera = TEMPLATES
        .as_ref()
        .map_err(|e| AppError::Render(e.to_string()))?;
    Ok(tera.render(TEMPLATE_NAME, &context)?)
}
