//! # Resume Profile
//!
//! The resume record edited alongside the build track.
//!
//! Scalar fields are free text. The repeatable sections (education,
//! experience, projects) are [`Section`]s: ordered lists that always hold at
//! least one item. Items have no identity beyond their position, so edits
//! and removals are positional.
//!
//! The JSON shape (camelCase keys) matches what the browser app stored under
//! `resume_build_data`, so existing saved data loads unchanged.

use crate::primitives::RESUME_KEY;
use crate::storage::Store;
use crate::TrackError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// SECTION KIND
// =============================================================================

/// The repeatable sections of a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Education,
    Experience,
    Projects,
}

impl SectionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Education => "education",
            SectionKind::Experience => "experience",
            SectionKind::Projects => "projects",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "education" => Ok(SectionKind::Education),
            "experience" => Ok(SectionKind::Experience),
            "projects" | "project" => Ok(SectionKind::Projects),
            other => Err(TrackError::NotFound(format!("section '{}'", other))),
        }
    }
}

// =============================================================================
// SECTION ITEMS
// =============================================================================

/// A fixed-shape record inside a [`Section`].
pub trait SectionItem: Default + Clone {
    /// The section this item belongs to.
    const KIND: SectionKind;

    /// Set one text field by name.
    fn set_field(&mut self, field: &str, value: String) -> Result<(), TrackError>;
}

fn unknown_field(kind: &str, field: &str) -> TrackError {
    TrackError::NotFound(format!("{} field '{}'", kind, field))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: String,
    pub degree: String,
    pub year: String,
}

impl SectionItem for Education {
    const KIND: SectionKind = SectionKind::Education;

    fn set_field(&mut self, field: &str, value: String) -> Result<(), TrackError> {
        match field {
            "school" => self.school = value,
            "degree" => self.degree = value,
            "year" => self.year = value,
            _ => return Err(unknown_field("education", field)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub company: String,
    pub position: String,
    pub duration: String,
    pub description: String,
}

impl SectionItem for Experience {
    const KIND: SectionKind = SectionKind::Experience;

    fn set_field(&mut self, field: &str, value: String) -> Result<(), TrackError> {
        match field {
            "company" => self.company = value,
            "position" => self.position = value,
            "duration" => self.duration = value,
            "description" => self.description = value,
            _ => return Err(unknown_field("experience", field)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub link: String,
    pub description: String,
}

impl SectionItem for Project {
    const KIND: SectionKind = SectionKind::Projects;

    fn set_field(&mut self, field: &str, value: String) -> Result<(), TrackError> {
        match field {
            "name" => self.name = value,
            "link" => self.link = value,
            "description" => self.description = value,
            _ => return Err(unknown_field("project", field)),
        }
        Ok(())
    }
}

// =============================================================================
// SECTION
// =============================================================================

/// An ordered list that is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<T> {
    items: Vec<T>,
}

impl<T: SectionItem> Default for Section<T> {
    fn default() -> Self {
        Self {
            items: vec![T::default()],
        }
    }
}

impl<T: SectionItem> Section<T> {
    /// Build from items; `None` if `items` is empty.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Option<Self> {
        (!items.is_empty()).then_some(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Append a blank item at the end.
    pub fn push_blank(&mut self) {
        self.items.push(T::default());
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Remove and return the item at `index`.
    ///
    /// Fails with `LastItem` rather than leave the section empty.
    pub fn remove(&mut self, index: usize) -> Result<T, TrackError> {
        let len = self.items.len();
        if index >= len {
            return Err(self.out_of_range(index));
        }
        if len == 1 {
            return Err(TrackError::LastItem(T::KIND));
        }
        Ok(self.items.remove(index))
    }

    /// Set one field of the item at `index`.
    pub fn set_field(&mut self, index: usize, field: &str, value: String) -> Result<(), TrackError> {
        let err = self.out_of_range(index);
        self.items.get_mut(index).ok_or(err)?.set_field(field, value)
    }

    fn out_of_range(&self, index: usize) -> TrackError {
        TrackError::ItemOutOfRange {
            section: T::KIND,
            index,
            len: self.items.len(),
        }
    }
}

impl<'a, T> IntoIterator for &'a Section<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Section<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        if items.is_empty() {
            return Err(D::Error::invalid_length(0, &"at least one item"));
        }
        Ok(Self { items })
    }
}

// =============================================================================
// PROFILE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Links {
    pub github: String,
    pub linkedin: String,
}

/// The full resume record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeProfile {
    pub personal_info: PersonalInfo,
    pub summary: String,
    pub education: Section<Education>,
    pub experience: Section<Experience>,
    pub projects: Section<Project>,
    pub skills: String,
    pub links: Links,
}

impl ResumeProfile {
    /// The demo profile offered by "Load Sample Data".
    #[must_use]
    pub fn sample() -> Self {
        Self {
            personal_info: PersonalInfo {
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
                phone: "+1 234 567 890".to_string(),
                location: "San Francisco, CA".to_string(),
            },
            summary: "Experienced Software Engineer with a passion for building scalable web \
                      applications and AI-driven solutions."
                .to_string(),
            education: Section {
                items: vec![Education {
                    school: "Stanford University".to_string(),
                    degree: "B.S. Computer Science".to_string(),
                    year: "2016 - 2020".to_string(),
                }],
            },
            experience: Section {
                items: vec![
                    Experience {
                        company: "Tech Corp".to_string(),
                        position: "Senior Engineer".to_string(),
                        duration: "2021 - Present".to_string(),
                        description: "Leading the development of a high-traffic e-commerce \
                                      platform."
                            .to_string(),
                    },
                    Experience {
                        company: "Startup X".to_string(),
                        position: "Full Stack Developer".to_string(),
                        duration: "2020 - 2021".to_string(),
                        description: "Built and launched multiple products using React and \
                                      Node.js."
                            .to_string(),
                    },
                ],
            },
            projects: Section {
                items: vec![Project {
                    name: "AI Resume Builder".to_string(),
                    link: "https://github.com/jdoe/resumebuilder".to_string(),
                    description: "A premium resume generation tool using LLMs.".to_string(),
                }],
            },
            skills: "React, Node.js, TypeScript, Python, AWS, GraphQL".to_string(),
            links: Links {
                github: "https://github.com/jdoe".to_string(),
                linkedin: "https://linkedin.com/in/jdoe".to_string(),
            },
        }
    }

    /// Number of items in a section.
    #[must_use]
    pub fn section_len(&self, kind: SectionKind) -> usize {
        match kind {
            SectionKind::Education => self.education.len(),
            SectionKind::Experience => self.experience.len(),
            SectionKind::Projects => self.projects.len(),
        }
    }

    /// Append a blank item; returns the new length.
    pub fn add_item(&mut self, kind: SectionKind) -> usize {
        match kind {
            SectionKind::Education => self.education.push_blank(),
            SectionKind::Experience => self.experience.push_blank(),
            SectionKind::Projects => self.projects.push_blank(),
        }
        self.section_len(kind)
    }

    /// Remove the item at `index` from a section.
    pub fn remove_item(&mut self, kind: SectionKind, index: usize) -> Result<(), TrackError> {
        match kind {
            SectionKind::Education => self.education.remove(index).map(drop),
            SectionKind::Experience => self.experience.remove(index).map(drop),
            SectionKind::Projects => self.projects.remove(index).map(drop),
        }
    }

    /// Set a field of the item at `index`.
    pub fn set_item_field(
        &mut self,
        kind: SectionKind,
        index: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), TrackError> {
        let value = value.into();
        match kind {
            SectionKind::Education => self.education.set_field(index, field, value),
            SectionKind::Experience => self.experience.set_field(index, field, value),
            SectionKind::Projects => self.projects.set_field(index, field, value),
        }
    }

    /// Set a scalar field by name.
    ///
    /// Names: `name`, `email`, `phone`, `location`, `summary`, `skills`,
    /// `github`, `linkedin`.
    pub fn set_field(&mut self, field: &str, value: impl Into<String>) -> Result<(), TrackError> {
        let value = value.into();
        match field {
            "name" => self.personal_info.name = value,
            "email" => self.personal_info.email = value,
            "phone" => self.personal_info.phone = value,
            "location" => self.personal_info.location = value,
            "summary" => self.summary = value,
            "skills" => self.skills = value,
            "github" => self.links.github = value,
            "linkedin" => self.links.linkedin = value,
            _ => return Err(unknown_field("resume", field)),
        }
        Ok(())
    }
}

// =============================================================================
// REPOSITORY
// =============================================================================

/// Loads and saves the profile as JSON through a [`Store`].
pub struct ResumeRepository;

impl ResumeRepository {
    /// Load the saved profile, or the blank default if none was saved.
    pub fn load<S: Store>(store: &S) -> Result<ResumeProfile, TrackError> {
        match store.get(RESUME_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| TrackError::Corrupt(e.to_string())),
            None => Ok(ResumeProfile::default()),
        }
    }

    /// Save the profile, replacing any earlier one.
    pub fn save<S: Store>(store: &mut S, profile: &ResumeProfile) -> Result<(), TrackError> {
        let raw =
            serde_json::to_string(profile).map_err(|e| TrackError::Serialization(e.to_string()))?;
        store.set(RESUME_KEY, &raw)
    }
}

// =============================================================================
// TESTS
// =============================================================================
