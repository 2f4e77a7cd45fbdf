pub struct Stack<T> {
    list: Vec<T>,
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Stack<T> {
    pub fn new() -> Stack<T> {
        Stack { list: Vec::new() }
    }

    pub fn push(&mut self, value: T) {
        self.list.push(value);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.list.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.list.last()
    }

}

#[cfg(test)]
mod tests {
    use super::Stack;

    #[test]
    fn test_stack() {
        let mut stack = Stack::new();
        assert_eq!(stack.peek(), None);
        stack.push("Outer");
        stack.push("Inner");
        assert_eq!(stack.peek(), Some(&"Inner"));
        assert_eq!(stack.pop(), Some("Inner"));
        assert_eq!(stack.pop(), Some("Outer"));
        assert_eq!(stack.pop(), None);
    }
}
