use crate::LoadType;

/// Where the consumer last accessed the presented list, relative to loaded pages.
///
/// `page_offset` is the original offset of the page (0 is the page returned by
/// refresh, prepended pages are negative). `index_in_page` may fall outside the
/// page when the access hit a placeholder. Ordering is by position, then by
/// `from_retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewportHint {
    pub page_offset: i32,
    pub index_in_page: i32,
    pub from_retry: bool,
}

impl ViewportHint {
    pub const MIN: ViewportHint = ViewportHint {
        page_offset: i32::MIN,
        index_in_page: i32::MIN,
        from_retry: false,
    };
    pub const MAX: ViewportHint = ViewportHint {
        page_offset: i32::MAX,
        index_in_page: i32::MAX,
        from_retry: false,
    };

    pub fn new(page_offset: i32, index_in_page: i32) -> Self {
        Self {
            page_offset,
            index_in_page,
            from_retry: false,
        }
    }

    /// Copy of this hint marked for retry, as stashed after a failed load.
    pub fn for_retry(self) -> Self {
        Self {
            from_retry: true,
            ..self
        }
    }
}

/// A hint tagged with the edge generation that was live when it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationalViewportHint {
    pub generation: u32,
    pub hint: ViewportHint,
}

impl GenerationalViewportHint {
    pub const PREPEND_INITIAL: GenerationalViewportHint = GenerationalViewportHint {
        generation: 0,
        hint: ViewportHint::MAX,
    };
    pub const APPEND_INITIAL: GenerationalViewportHint = GenerationalViewportHint {
        generation: 0,
        hint: ViewportHint::MIN,
    };

    pub fn new(generation: u32, hint: ViewportHint) -> Self {
        Self { generation, hint }
    }

    /// Seed value for [`Self::coalesce`] on the given edge.
    pub fn initial(load_type: LoadType) -> Self {
        match load_type {
            LoadType::Prepend => Self::PREPEND_INITIAL,
            _ => Self::APPEND_INITIAL,
        }
    }

    /// Folds an incoming hint into the accumulated one for `load_type`.
    ///
    /// Retried hints always win, a newer generation replaces an older one, and
    /// otherwise the hint furthest toward the edge is kept.
    pub fn coalesce(self, incoming: Self, load_type: LoadType) -> Self {
        if incoming.hint.from_retry || incoming.generation > self.generation {
            return incoming;
        }
        let keep_accumulated = match load_type {
            LoadType::Prepend => self.hint < incoming.hint,
            _ => self.hint > incoming.hint,
        };
        if keep_accumulated {
            self
        } else {
            incoming
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(generation: u32, page_offset: i32, index_in_page: i32) -> GenerationalViewportHint {
        GenerationalViewportHint::new(generation, ViewportHint::new(page_offset, index_in_page))
    }

    #[test]
    fn prepend_keeps_earliest_hint() {
        let acc = GenerationalViewportHint::PREPEND_INITIAL
            .coalesce(at(0, 0, 5), LoadType::Prepend)
            .coalesce(at(0, -1, 2), LoadType::Prepend)
            .coalesce(at(0, 0, 1), LoadType::Prepend);
        assert_eq!(acc, at(0, -1, 2));
    }

    #[test]
    fn append_keeps_latest_hint() {
        let acc = GenerationalViewportHint::APPEND_INITIAL
            .coalesce(at(0, 1, 0), LoadType::Append)
            .coalesce(at(0, 0, 9), LoadType::Append);
        assert_eq!(acc, at(0, 1, 0));
    }

    #[test]
    fn newer_generation_replaces_more_extreme_hint() {
        let acc = at(0, 5, 0).coalesce(at(1, 0, 0), LoadType::Append);
        assert_eq!(acc, at(1, 0, 0));
    }

    #[test]
    fn retried_hint_always_wins() {
        let retried = GenerationalViewportHint::new(0, ViewportHint::new(0, 0).for_retry());
        let acc = at(3, 9, 9).coalesce(retried, LoadType::Append);
        assert_eq!(acc, retried);
    }

    #[test]
    fn initial_values_are_replaced_by_first_hint() {
        for load_type in [LoadType::Prepend, LoadType::Append] {
            let acc = GenerationalViewportHint::initial(load_type).coalesce(at(0, 0, 0), load_type);
            assert_ne!(acc, GenerationalViewportHint::initial(load_type));
        }
    }
}
