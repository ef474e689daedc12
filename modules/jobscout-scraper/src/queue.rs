//! Keyword queue builder: expands the curated keyword list into an ordered
//! sequence of search-job descriptors. Pure and deterministic, no I/O.

use jobscout_common::SearchJobDescriptor;

/// Curated tech keywords to search each run.
pub const TECH_KEYWORDS: &[&str] = &[
    "react",
    "angular",
    "vue",
    "javascript",
    "typescript",
    "frontend developer",
    "node.js",
    "python",
    "java",
    "php",
    "backend developer",
    "full stack developer",
    "software engineer",
    "mern stack",
    "web developer",
    "react native",
    "flutter",
    "android developer",
    "ios developer",
    "devops",
    "aws",
    "docker",
    "kubernetes",
    "cloud",
    "data science",
    "machine learning",
    "data analyst",
    "ui ux designer",
    "qa engineer",
    "mongodb",
    "postgresql",
    "graphql",
    "spring boot",
    "django",
    "laravel",
    ".net",
    "c#",
    "ruby on rails",
    "wordpress",
    "fresher",
    "intern",
    "trainee",
    "junior developer",
    "entry level",
];

/// Experience-level modifiers, cross-joined with keywords when enabled.
/// The empty string means "all levels".
pub const EXPERIENCE_LEVELS: &[&str] = &[
    "",
    "fresher",
    "0-1 years",
    "1-3 years",
    "3-5 years",
    "5+ years",
];

const SEARCH_BASE_URL: &str = "https://www.linkedin.com/jobs/search";

/// Builds the run's descriptor queue from a keyword list and target location.
pub struct QueueBuilder<'a> {
    keywords: &'a [&'a str],
    experience_levels: &'a [&'a str],
    location: String,
    geo_id: String,
}

impl<'a> QueueBuilder<'a> {
    pub fn new(keywords: &'a [&'a str], location: &str, geo_id: &str) -> Self {
        Self {
            keywords,
            experience_levels: &[],
            location: location.to_string(),
            geo_id: geo_id.to_string(),
        }
    }

    /// Cross-join every keyword with every experience level.
    pub fn with_experience_levels(mut self, levels: &'a [&'a str]) -> Self {
        self.experience_levels = levels;
        self
    }

    /// Produce the descriptor queue: one pending descriptor per keyword (or
    /// per keyword x experience level), in input order.
    pub fn build(&self) -> Vec<SearchJobDescriptor> {
        let mut queue = Vec::new();
        for keyword in self.keywords {
            if self.experience_levels.is_empty() {
                queue.push(self.descriptor(keyword));
            } else {
                for level in self.experience_levels {
                    let search_keyword = format!("{keyword} {level}");
                    queue.push(self.descriptor(search_keyword.trim()));
                }
            }
        }
        queue
    }

    fn descriptor(&self, keyword: &str) -> SearchJobDescriptor {
        SearchJobDescriptor::new(
            keyword.to_string(),
            self.location.clone(),
            self.geo_id.clone(),
            category_for_keyword(keyword).to_string(),
        )
    }
}

/// Build the search URL for one descriptor.
pub fn search_url(descriptor: &SearchJobDescriptor) -> String {
    let mut url = url::Url::parse(SEARCH_BASE_URL).expect("valid base url");
    url.query_pairs_mut()
        .append_pair("keywords", &descriptor.keyword)
        .append_pair("location", &descriptor.location)
        .append_pair("geoId", &descriptor.geo_id)
        .append_pair("f_JT", "F")
        .append_pair("position", "1")
        .append_pair("pageNum", "0");
    url.to_string()
}

/// Coarse category bucket for a search keyword.
pub fn category_for_keyword(keyword: &str) -> &'static str {
    let kw = keyword.to_lowercase();
    if ["react", "angular", "vue", "javascript", "typescript", "frontend"]
        .iter()
        .any(|t| kw.contains(t))
    {
        "Frontend"
    } else if ["node", "python", "java", "php", "backend", ".net", "django", "laravel", "spring"]
        .iter()
        .any(|t| kw.contains(t))
    {
        "Backend"
    } else if kw.contains("full stack") || kw.contains("mern") || kw.contains("mean") {
        "Full Stack"
    } else if ["devops", "aws", "docker", "kubernetes", "cloud"]
        .iter()
        .any(|t| kw.contains(t))
    {
        "DevOps"
    } else if kw.contains("data") || kw.contains("machine") || kw.contains("ai") {
        "Data Science"
    } else if ["mobile", "android", "ios", "flutter"].iter().any(|t| kw.contains(t)) {
        "Mobile"
    } else if kw.contains("ui") || kw.contains("ux") || kw.contains("design") {
        "Design"
    } else if ["fresher", "intern", "trainee", "junior", "entry level"]
        .iter()
        .any(|t| kw.contains(t))
    {
        "Entry Level"
    } else {
        "General"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscout_common::JobStatus;

    #[test]
    fn builds_one_descriptor_per_keyword_in_order() {
        let keywords = ["python", "react", "devops"];
        let queue = QueueBuilder::new(&keywords, "Jaipur", "101716408").build();

        assert_eq!(queue.len(), keywords.len());
        for (descriptor, keyword) in queue.iter().zip(keywords.iter()) {
            assert_eq!(descriptor.keyword, *keyword);
            assert_eq!(descriptor.status, JobStatus::Pending);
            assert_eq!(descriptor.location, "Jaipur");
            assert_eq!(descriptor.geo_id, "101716408");
        }
    }

    #[test]
    fn experience_levels_cross_join_multiplies_queue() {
        let keywords = ["python", "react"];
        let levels = ["", "fresher", "5+ years"];
        let queue = QueueBuilder::new(&keywords, "Jaipur", "101716408")
            .with_experience_levels(&levels)
            .build();

        assert_eq!(queue.len(), keywords.len() * levels.len());
        // Empty level leaves the bare keyword, others append the modifier.
        assert_eq!(queue[0].keyword, "python");
        assert_eq!(queue[1].keyword, "python fresher");
        assert_eq!(queue[2].keyword, "python 5+ years");
        assert_eq!(queue[3].keyword, "react");
        assert!(queue.iter().all(|d| d.status == JobStatus::Pending));
    }

    #[test]
    fn empty_keyword_list_builds_empty_queue() {
        let queue = QueueBuilder::new(&[], "Jaipur", "101716408").build();
        assert!(queue.is_empty());
    }

    #[test]
    fn search_url_encodes_keyword_and_location() {
        let d = SearchJobDescriptor::new(
            "full stack developer".into(),
            "Jaipur".into(),
            "101716408".into(),
            "Full Stack".into(),
        );
        let url = search_url(&d);
        assert!(url.starts_with("https://www.linkedin.com/jobs/search?"));
        assert!(url.contains("keywords=full+stack+developer"));
        assert!(url.contains("location=Jaipur"));
        assert!(url.contains("geoId=101716408"));
    }

    #[test]
    fn keyword_categories() {
        assert_eq!(category_for_keyword("react js"), "Frontend");
        assert_eq!(category_for_keyword("python"), "Backend");
        assert_eq!(category_for_keyword("mern stack"), "Full Stack");
        assert_eq!(category_for_keyword("kubernetes"), "DevOps");
        assert_eq!(category_for_keyword("fresher"), "Entry Level");
        assert_eq!(category_for_keyword("gemstone"), "General");
    }
}
