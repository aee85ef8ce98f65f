//! Long, short and net positions per trader category, from the ledger rows.

use std::{fmt, str::FromStr};

use jiff::civil::Date;
use tabled::{builder::Builder, settings::Style};

use crate::db::gsheets::ledger::{LedgerRecord, LedgerSnapshot};

/// One CME bitcoin futures contract is for 5 BTC
pub const CONTRACT_SIZE_BTC: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Dealer,
    AssetManager,
    LeveragedFunds,
    OtherReportables,
    Nonreportable,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Dealer,
        Category::AssetManager,
        Category::LeveragedFunds,
        Category::OtherReportables,
        Category::Nonreportable,
    ];

    /// Column name prefix in the TFF report
    fn column_prefix(&self) -> &'static str {
        match self {
            Category::Dealer => "Dealer",
            Category::AssetManager => "Asset_Mgr",
            Category::LeveragedFunds => "Lev_Money",
            Category::OtherReportables => "Other_Rept",
            Category::Nonreportable => "NonRept",
        }
    }

    pub fn long_column(&self) -> String {
        format!("{}_Positions_Long_All", self.column_prefix())
    }

    pub fn short_column(&self) -> String {
        format!("{}_Positions_Short_All", self.column_prefix())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Dealer => "Dealer",
            Category::AssetManager => "Asset Manager",
            Category::LeveragedFunds => "Leveraged Funds",
            Category::OtherReportables => "Other Reportables",
            Category::Nonreportable => "Nonreportable",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Contracts,
    Btc,
}

impl Unit {
    pub fn scale(&self) -> f64 {
        match self {
            Unit::Contracts => 1.0,
            Unit::Btc => CONTRACT_SIZE_BTC,
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contracts" => Ok(Unit::Contracts),
            "btc" => Ok(Unit::Btc),
            _ => Err(format!("Unknown unit {}, use btc or contracts", s)),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Contracts => write!(f, "contracts"),
            Unit::Btc => write!(f, "BTC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub long: f64,
    pub short: f64,
}

impl Position {
    pub fn net(&self) -> f64 {
        self.long - self.short
    }
}

/// Positions of one weekly report, in contracts
#[derive(Debug, Clone, PartialEq)]
pub struct PositioningPoint {
    pub date: Date,
    pub open_interest: f64,
    pub positions: [Position; 5],
}

impl PositioningPoint {
    pub fn position(&self, category: Category) -> Position {
        let i = Category::ALL.iter().position(|c| *c == category).unwrap_or(0);
        self.positions[i]
    }

    pub fn total_long(&self) -> f64 {
        self.positions.iter().map(|p| p.long).sum()
    }

    fn from_record(date: Date, record: &LedgerRecord) -> PositioningPoint {
        let num = |col: &str| {
            record
                .get(col)
                .and_then(|v| v.trim().replace(',', "").parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        let positions = Category::ALL.map(|c| Position {
            long: num(&c.long_column()),
            short: num(&c.short_column()),
        });
        PositioningPoint {
            date,
            open_interest: num("Open_Interest_All"),
            positions,
        }
    }
}

/// Points for the futures-only rows of the ledger, oldest first.
pub fn positioning_points(snapshot: &LedgerSnapshot) -> Vec<PositioningPoint> {
    snapshot
        .dated_records()
        .into_iter()
        .filter(|(_, r)| match r.get("FutOnly_or_Combined") {
            Some(kind) => kind.trim() == "FutOnly",
            None => true,
        })
        .map(|(date, r)| PositioningPoint::from_record(date, r))
        .collect()
}

/// Week over week figures for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStat {
    pub category: Category,
    pub long: f64,
    pub long_change: f64,
    pub long_pct_oi: f64,
    pub short: f64,
    pub short_change: f64,
    pub short_pct_oi: f64,
    pub net: f64,
    pub net_change: f64,
}

/// Compare two reports.  Percentages are of the summed long positions.
pub fn category_stats(curr: &PositioningPoint, prev: &PositioningPoint) -> Vec<CategoryStat> {
    let market_size = curr.total_long();
    let pct = |v: f64| {
        if market_size > 0.0 {
            v / market_size * 100.0
        } else {
            0.0
        }
    };
    Category::ALL
        .iter()
        .map(|&category| {
            let c = curr.position(category);
            let p = prev.position(category);
            CategoryStat {
                category,
                long: c.long,
                long_change: c.long - p.long,
                long_pct_oi: pct(c.long),
                short: c.short,
                short_change: c.short - p.short,
                short_pct_oi: pct(c.short),
                net: c.net(),
                net_change: c.net() - p.net(),
            }
        })
        .collect()
}

fn signed(v: f64) -> String {
    if v > 0.0 {
        format!("+{:.0}", v)
    } else {
        format!("{:.0}", v)
    }
}

/// Make an ASCII table from the stats
pub fn ascii_table(stats: &[CategoryStat], unit: Unit) -> tabled::Table {
    let s = unit.scale();
    let mut builder = Builder::new();
    builder.push_record(vec![
        "Category", "Long", "Change", "% OI", "Short", "Change", "% OI", "Net", "Change",
    ]);
    for x in stats {
        builder.push_record(vec![
            x.category.to_string(),
            format!("{:.0}", x.long * s),
            signed(x.long_change * s),
            format!("{:.1}", x.long_pct_oi),
            format!("{:.0}", x.short * s),
            signed(x.short_change * s),
            format!("{:.1}", x.short_pct_oi),
            format!("{:.0}", x.net * s),
            signed(x.net_change * s),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn snapshot() -> LedgerSnapshot {
        let header = vec![
            "Report_Date_as_YYYY-MM-DD",
            "FutOnly_or_Combined",
            "Open_Interest_All",
            "Dealer_Positions_Long_All",
            "Dealer_Positions_Short_All",
            "Asset_Mgr_Positions_Long_All",
            "Asset_Mgr_Positions_Short_All",
            "Lev_Money_Positions_Long_All",
            "Lev_Money_Positions_Short_All",
        ];
        let rows = vec![
            header,
            vec!["2024-05-07", "FutOnly", "20000", "100", "300", "5000", "1000", "2000", "9000"],
            vec!["2024-05-07", "Combined", "30000", "1", "1", "1", "1", "1", "1"],
            vec!["2024-04-30", "FutOnly", "19000", "120", "250", "4500", "1100", "2500", "8000"],
        ];
        LedgerSnapshot::from_rows(
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn points_are_futures_only_and_sorted() {
        let points = positioning_points(&snapshot());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, date(2024, 4, 30));
        assert_eq!(points[1].open_interest, 20000.0);
        // missing columns count as zero
        assert_eq!(
            points[1].position(Category::Nonreportable),
            Position {
                long: 0.0,
                short: 0.0
            }
        );
    }

    #[test]
    fn week_over_week() {
        let points = positioning_points(&snapshot());
        let stats = category_stats(&points[1], &points[0]);
        let am = &stats[1];
        assert_eq!(am.category, Category::AssetManager);
        assert_eq!(am.net, 4000.0);
        assert_eq!(am.net_change, 4000.0 - 3400.0);
        assert_eq!(am.long_change, 500.0);
        // 5000 out of 7100 long contracts
        assert!((am.long_pct_oi - 70.4225).abs() < 1e-3);
    }

    #[test]
    fn units() {
        assert_eq!("BTC".parse::<Unit>(), Ok(Unit::Btc));
        assert_eq!("contracts".parse::<Unit>(), Ok(Unit::Contracts));
        assert!("lots".parse::<Unit>().is_err());
    }

    #[test]
    fn table_in_btc() {
        let points = positioning_points(&snapshot());
        let stats = category_stats(&points[1], &points[0]);
        let table = ascii_table(&stats, Unit::Btc).to_string();
        assert!(table.contains("Leveraged Funds"));
        // 4000 net contracts are 20000 BTC
        assert!(table.contains("20000"));
    }
}
