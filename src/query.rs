//! Flux query construction.

use std::collections::BTreeMap;

/// Everything needed to build the Flux query for one check run.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec {
    pub bucket: String,
    pub measurement: String,
    pub fields: Vec<String>,
    /// Inserted verbatim between the `_field` equality tests, e.g. `or`.
    pub field_combinator: String,
    pub tags: BTreeMap<String, String>,
    pub host: String,
    /// Flux duration literal such as `5m`.
    pub period: String,
    /// Flux function used by `aggregateWindow`, e.g. `mean`.
    pub aggregate: String,
    pub fill_nulls: bool,
    pub difference: bool,
}

impl QuerySpec {
    /// Builds the Flux query.
    ///
    /// Stages always appear in the same order: source, range, measurement filter, field filter,
    /// tag filters, host filter, the optional `fill` and `difference` stages and finally
    /// `aggregateWindow`.
    pub fn build(&self) -> String {
        let mut stages = vec![
            format!("from(bucket: \"{}\")", escape(&self.bucket)),
            format!("range(start: -{})", self.period),
            equality_filter("_measurement", &self.measurement),
            self.field_filter(),
        ];

        stages.extend(
            self.tags
                .iter()
                .map(|(key, value)| equality_filter(key, value)),
        );
        stages.push(equality_filter("host", &self.host));

        if self.fill_nulls {
            stages.push("fill(column:\"_value\", value:0)".to_owned());
        }
        if self.difference {
            stages.push("difference(nonNegative:false, columns:[\"_value\"])".to_owned());
        }

        stages.push(format!(
            "aggregateWindow(every: {}, fn: {})",
            self.period, self.aggregate
        ));

        stages.join("\n  |> ")
    }

    /// The field name used to label a single returned value.
    pub fn field_label(&self) -> String {
        self.fields.join("_")
    }

    fn field_filter(&self) -> String {
        let separator = format!(" {} ", self.field_combinator);
        let tests = self
            .fields
            .iter()
            .map(|field| format!("r[\"_field\"] == \"{}\"", escape(field)))
            .collect::<Vec<_>>()
            .join(&separator);

        format!("filter(fn: (r) => {tests})")
    }
}

fn equality_filter(column: &str, value: &str) -> String {
    format!(
        "filter(fn: (r) => r[\"{}\"] == \"{}\")",
        escape(column),
        escape(value)
    )
}

// Flux string literal escaping
fn escape(s: &str) -> String {
    ["\\", "\""]
        .iter()
        .fold(s.to_string(), |acc, c| acc.replace(c, &format!("\\{}", c)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn spec() -> QuerySpec {
        QuerySpec {
            bucket: "telegraf".to_owned(),
            measurement: "cpu".to_owned(),
            fields: vec!["usage_user".to_owned()],
            field_combinator: String::new(),
            tags: BTreeMap::new(),
            host: "web01".to_owned(),
            period: "5m".to_owned(),
            aggregate: "mean".to_owned(),
            fill_nulls: true,
            difference: false,
        }
    }

    #[test]
    fn test_build_single_field() {
        let query = spec().build();

        assert_eq!(
            query,
            "from(bucket: \"telegraf\")\n  \
             |> range(start: -5m)\n  \
             |> filter(fn: (r) => r[\"_measurement\"] == \"cpu\")\n  \
             |> filter(fn: (r) => r[\"_field\"] == \"usage_user\")\n  \
             |> filter(fn: (r) => r[\"host\"] == \"web01\")\n  \
             |> fill(column:\"_value\", value:0)\n  \
             |> aggregateWindow(every: 5m, fn: mean)"
        );
        assert_eq!(query.matches("aggregateWindow").count(), 1);
        assert_eq!(query.matches("fill(").count(), 1);
        assert_eq!(query.matches("difference(").count(), 0);
    }

    #[test]
    fn test_build_with_options() {
        let mut spec = spec();
        spec.fill_nulls = false;
        spec.difference = true;
        spec.aggregate = "last".to_owned();

        let query = spec.build();

        assert!(!query.contains("fill("));
        assert!(query.ends_with(
            "|> difference(nonNegative:false, columns:[\"_value\"])\n  \
             |> aggregateWindow(every: 5m, fn: last)"
        ));
    }

    #[test]
    fn test_build_multiple_fields() {
        let mut spec = spec();
        spec.fields = vec!["rx".to_owned(), "tx".to_owned()];
        spec.field_combinator = "or".to_owned();

        assert!(spec
            .build()
            .contains("filter(fn: (r) => r[\"_field\"] == \"rx\" or r[\"_field\"] == \"tx\")"));
        assert_eq!(spec.field_label(), "rx_tx");
    }

    #[test]
    fn test_tag_filters_between_field_and_host() {
        let mut spec = spec();
        spec.tags.insert("cpu".to_owned(), "cpu-total".to_owned());
        spec.tags.insert("az".to_owned(), "eu-1".to_owned());

        let query = spec.build();
        let position = |needle: &str| query.find(needle).unwrap();

        let field = position("r[\"_field\"]");
        let host = position("r[\"host\"]");
        for tag in ["r[\"cpu\"] == \"cpu-total\"", "r[\"az\"] == \"eu-1\""] {
            let tag = position(tag);
            assert!(field < tag && tag < host);
        }
    }

    #[test]
    fn test_escape_string_literals() {
        let mut spec = spec();
        spec.host = "we\"b\\01".to_owned();

        assert!(spec
            .build()
            .contains("r[\"host\"] == \"we\\\"b\\\\01\""));
    }
}
