use crate::common::VertexKind;

/// Steps left before the forced shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    remaining: usize,
}

impl Deadline {
    pub fn new(remaining: usize) -> Self {
        Deadline { remaining }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Walks `cost` steps. `None` if the edge is unreachable or longer than
    /// the steps left.
    pub fn travel(self, cost: Option<usize>) -> Option<Deadline> {
        let remaining = self.remaining.checked_sub(cost?)?;
        Some(Deadline { remaining })
    }

    /// Applies the effect of stepping onto a not yet visited vertex. Delays
    /// saturate at `usize::MAX` steps.
    pub fn extend(self, kind: VertexKind) -> Deadline {
        match kind {
            VertexKind::Button { delay } => Deadline {
                remaining: self.remaining.saturating_add(delay),
            },
            _ => self,
        }
    }

    /// Travel first, then extend: a button only helps once it has been
    /// reached within the old deadline.
    pub fn arrive(self, cost: Option<usize>, kind: VertexKind) -> Option<Deadline> {
        self.travel(cost).map(|deadline| deadline.extend(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_within_budget() {
        let deadline = Deadline::new(5);
        assert_eq!(deadline.travel(Some(3)), Some(Deadline::new(2)));
        assert_eq!(deadline.travel(Some(5)), Some(Deadline::new(0)));
        assert_eq!(deadline.travel(Some(6)), None);
        assert_eq!(deadline.travel(None), None);
    }

    #[test]
    fn test_button_extends_after_travel() {
        let button = VertexKind::Button { delay: 5 };
        assert_eq!(Deadline::new(3).arrive(Some(3), button), Some(Deadline::new(5)));
        // The delay cannot pay for the trip to the button itself.
        assert_eq!(Deadline::new(2).arrive(Some(3), button), None);
    }

    #[test]
    fn test_huge_delay_saturates() {
        let button = VertexKind::Button { delay: usize::MAX };
        assert_eq!(
            Deadline::new(4).arrive(Some(1), button),
            Some(Deadline::new(usize::MAX))
        );
        assert_eq!(
            Deadline::new(usize::MAX).extend(VertexKind::Button { delay: 7 }),
            Deadline::new(usize::MAX)
        );
    }

    #[test]
    fn test_coin_does_not_extend() {
        let coin = VertexKind::Coin { value: 4 };
        assert_eq!(Deadline::new(4).arrive(Some(1), coin), Some(Deadline::new(3)));
    }
}
