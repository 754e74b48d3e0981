//! `.csv` and `.tsv` files.
//!
//! The header row defines a nested `Row` class with one `String` field per
//! column; the data rows are exposed through `rows()`.

use crate::codegen::{ClassBuilder, ToJava};
use crate::diagnostic::{Diagnostic, DiagnosticSink, Position};
use crate::fqn::{make_identifier, FqnCache};
use crate::manifold::{GenError, GenResult, TypeManifold};
use crate::model::SingleFileModel;
use crate::vfs::File;

/// Name of the nested row class.
pub const ROW_CLASS: &str = "Row";

/// Parsed delimited table.
#[derive(Debug)]
pub struct Table {
    /// Column identifiers, unique, in header order.
    pub columns: Vec<String>,
    /// Data rows, padded or truncated to the column count.
    pub rows: Vec<Vec<String>>,
    decls: FqnCache<()>,
    warnings: Vec<Diagnostic>,
}

impl Table {
    /// Parse delimited `text` as the resource behind `fqn`.
    pub fn parse(fqn: &str, text: &str, delimiter: char) -> GenResult<Self> {
        let records = split_records(fqn, text, delimiter)?;
        let mut records = records.into_iter().filter(|(_, fields)| !is_blank(fields));
        let Some((_, header)) = records.next() else {
            return Err(GenError::malformed(fqn, "missing header row"));
        };

        let columns = column_names(&header);
        let mut rows = Vec::new();
        let mut warnings = Vec::new();
        for (offset, mut fields) in records {
            if fields.len() != columns.len() {
                let position = Position::from_offset(text, offset);
                warnings.push(
                    Diagnostic::warning(
                        fqn,
                        format!("row has {} fields, header has {}", fields.len(), columns.len()),
                    )
                    .with_position(position),
                );
                fields.resize(columns.len(), String::new());
            }
            rows.push(fields);
        }

        let mut decls = FqnCache::new();
        decls.add_name(ROW_CLASS);
        Ok(Self {
            columns,
            rows,
            decls,
            warnings,
        })
    }
}

fn is_blank(fields: &[String]) -> bool {
    fields.len() == 1 && fields[0].trim().is_empty()
}

fn column_names(header: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (i, raw) in header.iter().enumerate() {
        let raw = raw.trim();
        let base = if raw.is_empty() {
            format!("column{}", i + 1)
        } else {
            make_identifier(raw)
        };
        let mut name = base.clone();
        let mut n = 2;
        while names.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

/// Split into records of fields, each with the byte offset it starts at.
fn split_records(fqn: &str, text: &str, delimiter: char) -> GenResult<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut start = 0;
    let mut quote_start = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if quote_start.is_some() {
            match c {
                '"' if chars.peek().is_some_and(|&(_, next)| next == '"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quote_start = None,
                c => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => quote_start = Some(i),
            c if c == delimiter => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek().is_some_and(|&(_, next)| next == '\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push((start, std::mem::take(&mut fields)));
                start = i + 1;
            }
            c => field.push(c),
        }
    }

    if let Some(open) = quote_start {
        return Err(GenError::malformed_at(
            fqn,
            "unterminated quoted field",
            Position::from_offset(text, open),
        ));
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((start, fields));
    }
    Ok(records)
}

/// Manifold for comma- and tab-separated resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvManifold;

impl TypeManifold for CsvManifold {
    type Artifact = Table;

    fn name(&self) -> &'static str {
        "csv"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv", "tsv"]
    }

    fn parse(&self, fqn: &str, file: &File) -> GenResult<Table> {
        let text = file.read_to_string()?;
        let delimiter = if file.extension().eq_ignore_ascii_case("tsv") { '\t' } else { ',' };
        Table::parse(fqn, &text, delimiter)
    }

    fn declarations<'a>(&self, artifact: &'a Table) -> &'a FqnCache<()> {
        &artifact.decls
    }

    fn contribute(
        &self,
        fqn: &str,
        _existing: Option<&str>,
        model: &SingleFileModel<Table>,
        artifact: &Table,
        sink: &mut dyn DiagnosticSink,
    ) -> GenResult<String> {
        for warning in &artifact.warnings {
            sink.report(warning.clone());
        }
        let class = build_class(super::resource_class(fqn, model), artifact);
        Ok(super::unit(fqn).import("java.util.List").class(class).build())
    }
}

fn build_class(class: ClassBuilder, table: &Table) -> ClassBuilder {
    let class = class
        .constant("String[]", "HEADER", &table.columns)
        .constant_raw("int", "ROW_COUNT", table.rows.len().to_string());

    let mut body = vec!["return List.of(".to_string()];
    let last = table.rows.len().saturating_sub(1);
    for (i, row) in table.rows.iter().enumerate() {
        let args: Vec<String> = row.iter().map(ToJava::to_java).collect();
        let comma = if i < last { "," } else { "" };
        body.push(format!("    new {ROW_CLASS}({}){comma}", args.join(", ")));
    }
    body.push(");".to_string());

    let params: Vec<String> = table.columns.iter().map(|c| format!("String {c}")).collect();
    let assignments = table.columns.iter().map(|c| format!("this.{c} = {c};"));
    let mut row = ClassBuilder::nested(ROW_CLASS);
    for column in &table.columns {
        row = row.field("String", column);
    }
    let row = row.method(format!("public {ROW_CLASS}({})", params.join(", ")), assignments);

    class
        .method(format!("public static List<{ROW_CLASS}> rows()"), body)
        .inner(row)
}
