/// Name of the catch-all bucket, listed for completeness but never queried.
pub const CATCH_ALL: &str = "misc";

/// Minimum category relevance score a story needs to match a bucket.
pub const MIN_CATEGORY_SCORE: f32 = 0.7;

#[derive(Debug, PartialEq, Eq)]
pub struct Bucket {
    pub name: &'static str,
    pub codes: &'static [&'static str],
}

pub static BUCKETS: &[Bucket] = &[
    Bucket {
        name: "New Product",
        codes: &["ay.biz.newprod", "ay.biz.pdev"],
    },
    Bucket {
        name: "Acquisition",
        codes: &["ay.biz.manda", "ay.fin.spac"],
    },
    Bucket {
        name: "Funding",
        codes: &[
            "ay.fin.corpfund",
            "ay.fin.private",
            "ay.fin.grants",
            "ay.fin.persinv",
            "ay.fin.pefund",
            "ay.biz.majann",
        ],
    },
    Bucket {
        name: "IPO",
        codes: &[
            "ay.fin.offering",
            "ay.pol.govpriv",
            "ay.fin.short",
            "ay.fin.imbalanc",
            "ay.biz.majority",
        ],
    },
    Bucket {
        name: "New Hire",
        codes: &[
            "ay.biz.recruit",
            "ay.biz.brdmove",
            "ay.biz.corpgov",
            "ay.biz.execpers",
            "ay.lifesoc.persmove",
            "ay.lifesoc.hiring",
        ],
    },
    Bucket {
        name: "Earnings Reports",
        codes: &["ay.fin.reports", "ay.biz.annmtg", "ay.biz.earnpre"],
    },
    Bucket {
        name: "New Partnership",
        codes: &["ay.biz.newchan", "ay.biz.jointven", "ay.biz.stratall"],
    },
    Bucket {
        name: "Lawsuit",
        codes: &[
            "ay.biz.events",
            "ay.biz.crime",
            "ay.biz.litigate",
            "ay.lifesoc.cyber",
            "ay.lifesoc.litigate",
        ],
    },
    Bucket {
        name: CATCH_ALL,
        codes: &[
            "ay.biz.markfore",
            "ay.biz.changes",
            "ay.biz.emerging",
            "ay.biz.announce",
            "ay.biz.intprop",
            "ay.biz.out",
            "ay.biz.salmark",
            "ay.biz.sectors",
            "ay.biz.supplych",
            "ay.econ.area",
            "ay.econ.analysis",
            "ay.econ.dev",
            "ay.fin.agreemnt",
            "ay.fin.charehld",
            "ay.fin.porfol",
            "ay.fin.markets",
            "ay.bir.awards",
            "ay.econ.labor",
            "ay.biz.strikes",
            "ay.biz.layoffs",
            "ay.biz.philan",
            "ay.spec.events",
            "ay.spec.headline",
            "ay.lifesoc.briefs",
            "ay.appsci.spec",
        ],
    },
];

/// Buckets to dispatch, in table order, without the catch-all.
pub fn buckets_excluding_catch_all() -> Vec<&'static Bucket> {
    BUCKETS.iter().filter(|b| b.name != CATCH_ALL).collect()
}

impl Bucket {
    /// `(code1 OR code2 ...)` over this bucket's taxonomy codes.
    pub fn category_filter(&self) -> String {
        format!("({})", self.codes.join(" OR "))
    }

    /// AQL restricting stories to this bucket's categories.
    pub fn aql(&self) -> String {
        format!(
            "categories: {{{{taxonomy: aylien AND id: {} AND score: [{MIN_CATEGORY_SCORE} TO *]}}}}",
            self.category_filter()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catch_all_is_listed_but_never_dispatched() {
        assert!(BUCKETS.iter().any(|b| b.name == CATCH_ALL));

        let dispatched = buckets_excluding_catch_all();
        assert_eq!(dispatched.len(), BUCKETS.len() - 1);
        assert!(dispatched.iter().all(|b| b.name != CATCH_ALL));
    }

    #[test]
    fn catch_all_codes_never_reach_a_dispatched_query() {
        let misc = BUCKETS.iter().find(|b| b.name == CATCH_ALL).unwrap();
        for bucket in buckets_excluding_catch_all() {
            let aql = bucket.aql();
            for code in misc.codes {
                assert!(!aql.contains(code), "{code} leaked into {}", bucket.name);
            }
        }
    }

    #[test]
    fn dispatch_order_follows_table() {
        let names: Vec<_> = buckets_excluding_catch_all().iter().map(|b| b.name).collect();
        assert_eq!(
            names,
            vec![
                "New Product",
                "Acquisition",
                "Funding",
                "IPO",
                "New Hire",
                "Earnings Reports",
                "New Partnership",
                "Lawsuit",
            ]
        );
    }

    #[test]
    fn no_code_is_bucketed_twice() {
        let mut codes: Vec<_> = BUCKETS.iter().flat_map(|b| b.codes.iter()).collect();
        let total = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), total);
    }

    #[test]
    fn aql_wraps_filter_with_score_threshold() {
        let acquisition = BUCKETS.iter().find(|b| b.name == "Acquisition").unwrap();
        assert_eq!(acquisition.category_filter(), "(ay.biz.manda OR ay.fin.spac)");
        assert_eq!(
            acquisition.aql(),
            "categories: {{taxonomy: aylien AND id: (ay.biz.manda OR ay.fin.spac) AND score: [0.7 TO *]}}"
        );
    }
}
