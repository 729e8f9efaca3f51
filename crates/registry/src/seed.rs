//! Static seed of trusted portals: central and state government, the main
//! examining bodies, scheme portals, and a handful of widely-used
//! aggregators kept at lower priority.

use sahayak_types::{SourceType, TrustedSource};

/// Domains blocked from the start (spam / scam look-alikes).
pub const SEED_BLOCKED: &[&str] = &["fakesite.com", "scamjobs.com", "getrichquick.com"];

pub fn seed_sources() -> Vec<TrustedSource> {
    use SourceType::*;

    vec![
        // Central government
        TrustedSource::new("india.gov.in", Official, "National Portal of India", 10, &["scheme", "general", "government"]),
        TrustedSource::new("pib.gov.in", Official, "Press Information Bureau", 10, &["news", "announcement", "government"]),
        // Examining bodies
        TrustedSource::new("ssc.nic.in", Official, "Staff Selection Commission", 10, &["job", "result", "admit_card"]),
        TrustedSource::new("upsc.gov.in", Official, "Union Public Service Commission", 10, &["job", "result", "admit_card"]),
        TrustedSource::new("indianrailways.gov.in", Official, "Indian Railways", 10, &["job", "general"]),
        TrustedSource::new("rrbcdg.gov.in", Official, "Railway Recruitment Board", 10, &["job", "result", "admit_card"]),
        TrustedSource::new("ibps.in", Official, "Institute of Banking Personnel Selection", 10, &["job", "result", "admit_card"]),
        TrustedSource::new("nta.ac.in", Official, "National Testing Agency", 10, &["job", "result", "admit_card", "exam"]),
        // Scheme portals
        TrustedSource::new("pmkisan.gov.in", Official, "PM-KISAN Portal", 10, &["scheme", "kisan"]),
        TrustedSource::new("pmjay.gov.in", Official, "Ayushman Bharat Portal", 10, &["scheme", "health"]),
        TrustedSource::new("pmaymis.gov.in", Official, "PM Awas Yojana", 10, &["scheme", "housing"]),
        TrustedSource::new("nrega.nic.in", Official, "MGNREGA Portal", 10, &["scheme", "employment"]),
        TrustedSource::new("uidai.gov.in", Official, "UIDAI Aadhaar", 10, &["document", "identity"]),
        TrustedSource::new("pmjdy.gov.in", Official, "Jan Dhan Yojana", 10, &["scheme", "banking"]),
        TrustedSource::new("mudra.org.in", Official, "MUDRA Yojana", 10, &["scheme", "loan"]),
        // Education
        TrustedSource::new("cbse.gov.in", Official, "CBSE", 10, &["education", "result", "exam"]),
        TrustedSource::new("cbseresults.nic.in", Official, "CBSE Results", 10, &["result"]),
        TrustedSource::new("ugc.ac.in", Official, "UGC", 10, &["education", "scholarship"]),
        // State portals
        TrustedSource::new("bihar.gov.in", Official, "Bihar Government", 9, &["state", "scheme", "job"]),
        TrustedSource::new("biharboardonline.com", SemiOfficial, "Bihar Board", 8, &["result", "education"]),
        TrustedSource::new("bsebinteredu.in", SemiOfficial, "BSEB Inter Results", 8, &["result", "education"]),
        TrustedSource::new("up.gov.in", Official, "Uttar Pradesh Government", 9, &["state", "scheme", "job"]),
        TrustedSource::new("mp.gov.in", Official, "Madhya Pradesh Government", 9, &["state", "scheme", "job"]),
        TrustedSource::new("rajasthan.gov.in", Official, "Rajasthan Government", 9, &["state", "scheme", "job"]),
        // Defence recruitment
        TrustedSource::new("joinindianarmy.nic.in", Official, "Indian Army Recruitment", 10, &["job", "defence"]),
        TrustedSource::new("joinindiannavy.gov.in", Official, "Indian Navy Recruitment", 10, &["job", "defence"]),
        TrustedSource::new("indianairforce.nic.in", Official, "Indian Air Force", 10, &["job", "defence"]),
        TrustedSource::new("employmentnews.gov.in", Official, "Employment News", 9, &["job", "news"]),
        // Aggregators: useful coverage, lower trust
        TrustedSource::new("sarkariresult.com", Aggregator, "Sarkari Result", 5, &["job", "result", "admit_card"]),
        TrustedSource::new("sarkarijobfind.com", Aggregator, "Sarkari Job Find", 4, &["job", "result"]),
        TrustedSource::new("freejobalert.com", Aggregator, "Free Job Alert", 5, &["job", "result", "admit_card"]),
    ]
}
