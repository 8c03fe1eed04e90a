//! `mongo::StringMap<T>`: open-addressed table walked slot by slot

use super::{Child, Children, DisplayHint, Printer, Renderer};
use crate::debuginfo::{template_argument, InspectError, TypeError, Value};

pub struct StringMapPrinter<'a> {
    value: Value<'a>,
}

impl StringMapPrinter<'_> {
    /// Factory for the printer registry
    pub fn create<'a>(value: Value<'a>) -> Box<dyn Printer<'a> + 'a> {
        Box::new(StringMapPrinter { value })
    }
}

impl<'a> StringMapPrinter<'a> {
    /// The `T` of `StringMap<T>`
    fn element_type(&self) -> Result<String, TypeError> {
        template_argument(self.value.type_name(), 0)
            .or_else(|| template_argument(self.value.resolved_type_name(), 0))
            .map(str::to_string)
            .ok_or_else(|| TypeError::NoTemplateArgument(self.value.type_name().to_string(), 0))
    }

    /// Element count as recorded by the table
    fn reported_size(&self) -> Result<i128, InspectError> {
        self.value.field("_size")?.as_int()
    }
}

impl<'a> Printer<'a> for StringMapPrinter<'a> {
    fn to_string(&self, _renderer: &Renderer<'a>) -> Result<String, InspectError> {
        Ok(format!(
            "StringMap<{}> with {} elems",
            self.element_type()?,
            self.reported_size()?
        ))
    }

    fn children(&self, renderer: &Renderer<'a>) -> Result<Children<'a>, InspectError> {
        let area = self.value.field("_area")?;
        let capacity = area.field("_capacity")?.as_i64()?.max(0) as u64;
        let entries = area.field("_entries")?;

        // Slots may hold raw storage; view it through the table's value_type
        let value_type = format!("{}::value_type", self.value.resolved_type_name());
        let value_type = renderer
            .inspector()
            .types()
            .contains(&value_type)
            .then_some(value_type);

        Ok(Box::new(Slots {
            entries,
            capacity,
            next_slot: 0,
            value_type,
            pending: None,
            used: 0,
            reported: self.reported_size()?,
            done: false,
        }))
    }

    fn display_hint(&self) -> Option<DisplayHint> {
        Some(DisplayHint::Map)
    }
}

/// Iterator over used slots, yielding key then value for each
struct Slots<'a> {
    entries: Value<'a>,
    capacity: u64,
    next_slot: u64,
    value_type: Option<String>,
    /// Value half of the pair whose key was just yielded
    pending: Option<Child<'a>>,
    used: u64,
    reported: i128,
    done: bool,
}

impl<'a> Slots<'a> {
    /// Key and value children of slot `index`, or `None` for an empty slot
    fn read_slot(&self, index: u64) -> Result<Option<(Child<'a>, Child<'a>)>, InspectError> {
        let entry = self.entries.element(index)?;
        if !entry.field("used")?.as_bool()? {
            return Ok(None);
        }

        let data = entry.field("data")?;
        let pair = match &self.value_type {
            Some(value_type) => data.cast(value_type)?,
            None => data,
        };
        Ok(Some((
            Child::value(format!("k{}", index), pair.field("first")?),
            Child::value(format!("v{}", index), pair.field("second")?),
        )))
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if self.used as i128 != self.reported {
            log::debug!(
                "{}: _size is {} but {} slots are used",
                self.entries.type_name(),
                self.reported,
                self.used
            );
        }
    }
}

impl<'a> Iterator for Slots<'a> {
    type Item = Result<Child<'a>, InspectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(value) = self.pending.take() {
            return Some(Ok(value));
        }

        while self.next_slot < self.capacity {
            let index = self.next_slot;
            self.next_slot += 1;
            match self.read_slot(index) {
                Ok(Some((key, value))) => {
                    self.used += 1;
                    self.pending = Some(value);
                    return Some(Ok(key));
                }
                Ok(None) => continue,
                Err(e) => {
                    // A failed read ends the walk
                    self.next_slot = self.capacity;
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.finish();
        None
    }
}
